//! Producer session
//!
//! Drives one connection through key registration and the
//! receive, verify, admit, respond cycle.

use log::{debug, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncRead, BufReader};

use crate::auth::{decode_public_key, verify};
use crate::client::registry::{ConnectionRegistry, SharedWriter};
use crate::client::state::{SessionEnd, SessionState};
use crate::client::Identity;
use crate::error::{CollectorError, ProtocolError};
use crate::pool::{AdmitResult, CollectionPool};
use crate::protocol::{ResponseCode, Submission, read_public_key, read_submission, write_identity, write_response};
use crate::server::ShutdownCoordinator;

/// Shared collector components every session works against.
#[derive(Clone)]
pub struct SessionContext {
    pub registry: Arc<ConnectionRegistry>,
    pub pool: Arc<CollectionPool>,
    pub coordinator: Arc<ShutdownCoordinator>,
    pub max_key_length: usize,
}

pub struct Session<R> {
    reader: BufReader<R>,
    writer: SharedWriter,
    peer: String,
    identity: Option<Identity>,
    ctx: SessionContext,
}

impl<R> Session<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, writer: SharedWriter, peer: String, ctx: SessionContext) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            peer,
            identity: None,
            ctx,
        }
    }

    /// Runs the session to completion.
    ///
    /// A registered connection leaves the live set exactly once here,
    /// whatever ended the session.
    pub async fn run(mut self) -> Result<SessionEnd, CollectorError> {
        let result = self.drive().await;

        if let Some(identity) = self.identity {
            self.ctx.registry.unregister(identity);
        }
        result
    }

    async fn drive(&mut self) -> Result<SessionEnd, CollectorError> {
        let mut state = SessionState::AwaitingKey;

        loop {
            state = match state {
                SessionState::AwaitingKey => self.await_key().await?,
                SessionState::Registered(identity) => SessionState::Receiving(identity),
                SessionState::Receiving(identity) => self.receive(identity).await?,
                SessionState::Responding(identity, code) => self.respond(identity, code).await?,
                SessionState::Terminated(end) => return Ok(end),
            };
        }
    }

    async fn await_key(&mut self) -> Result<SessionState, CollectorError> {
        let token = self.ctx.coordinator.token();
        let pem = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(SessionState::Terminated(SessionEnd::Shutdown)),
            pem = read_public_key(&mut self.reader, self.ctx.max_key_length) => pem?,
        };

        let key = decode_public_key(&pem)?;

        // Registration makes the connection a broadcast target, so the
        // identity has to reach the peer before anything else can be written.
        let mut writer = self.writer.lock().await;
        let identity = self
            .ctx
            .registry
            .register(&self.peer, Arc::clone(&self.writer), key)?;
        self.identity = Some(identity);
        write_identity(&mut *writer, identity).await?;
        drop(writer);

        info!("Client {} registered as {}", self.peer, identity);
        Ok(SessionState::Registered(identity))
    }

    async fn receive(&mut self, identity: Identity) -> Result<SessionState, CollectorError> {
        let token = self.ctx.coordinator.token();
        let submission = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(SessionState::Terminated(SessionEnd::Shutdown)),
            submission = read_submission(&mut self.reader) => submission,
        };

        match submission {
            Ok(submission) => self.admit(identity, submission).await,
            Err(CollectorError::Protocol(ProtocolError::ConnectionClosed)) => {
                Ok(SessionState::Terminated(SessionEnd::Disconnected))
            }
            Err(e) => Err(e),
        }
    }

    /// Verifies the signature, then tries to admit the value.
    async fn admit(
        &mut self,
        identity: Identity,
        submission: Submission,
    ) -> Result<SessionState, CollectorError> {
        let Submission { value, signature } = submission;
        let key = self.ctx.registry.lookup_key(identity)?;

        if !verify(value, &signature, &key) {
            warn!("Invalid signature for {} from client {}", value, identity);
            return Ok(SessionState::Responding(identity, ResponseCode::InvalidSignature));
        }

        let next = match self.ctx.pool.try_admit(value, identity) {
            AdmitResult::Admitted { filled: false } => {
                info!(
                    "Received {} from client {}, pool length: {}",
                    value,
                    identity,
                    self.ctx.pool.size()
                );
                SessionState::Responding(identity, ResponseCode::Accepted)
            }
            AdmitResult::Admitted { filled: true } => {
                info!("Received {} from client {}, pool is full", value, identity);
                self.ctx.coordinator.trigger(identity, &self.writer).await;
                SessionState::Terminated(SessionEnd::Completed)
            }
            AdmitResult::Duplicate => {
                debug!("Rejected {} from client {} (duplicate)", value, identity);
                SessionState::Responding(identity, ResponseCode::Duplicate)
            }
            AdmitResult::Full => {
                // Another session filled the pool; its broadcast carries our Abort.
                debug!("Client {} submitted {} after the pool filled", identity, value);
                self.ctx.coordinator.token().cancelled().await;
                SessionState::Terminated(SessionEnd::Shutdown)
            }
        };

        Ok(next)
    }

    async fn respond(
        &mut self,
        identity: Identity,
        code: ResponseCode,
    ) -> Result<SessionState, CollectorError> {
        let mut writer = self.writer.lock().await;

        // A broadcast takes the connection out of the live set before it
        // writes, so once we are out the peer has its final code.
        if self.ctx.coordinator.is_shutting_down() || !self.ctx.registry.is_live(identity) {
            return Ok(SessionState::Terminated(SessionEnd::Shutdown));
        }
        write_response(&mut *writer, code).await?;
        Ok(SessionState::Receiving(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::keys::tests::TEST_KEYS;
    use crate::auth::{KeyPair, Signature, encode_public_key, sign};
    use crate::client::registry::shared_writer;
    use crate::error::AuthError;
    use crate::protocol::{read_identity, read_response, write_submission};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex, split};
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    fn context(capacity: usize) -> SessionContext {
        let registry = Arc::new(ConnectionRegistry::new());
        let pool = Arc::new(CollectionPool::new(capacity));
        let coordinator = Arc::new(ShutdownCoordinator::new(
            Arc::clone(&pool),
            Arc::clone(&registry),
        ));
        SessionContext {
            registry,
            pool,
            coordinator,
            max_key_length: 4096,
        }
    }

    type SessionHandle = JoinHandle<Result<SessionEnd, CollectorError>>;

    fn spawn_session(ctx: &SessionContext) -> (DuplexStream, SessionHandle) {
        let (client, _, session) = spawn_session_with_writer(ctx);
        (client, session)
    }

    /// Also hands back the session's writer so a test can hold its lock.
    fn spawn_session_with_writer(ctx: &SessionContext) -> (DuplexStream, SharedWriter, SessionHandle) {
        let (server, client) = duplex(8192);
        let (read_half, write_half) = split(server);
        let writer = shared_writer(write_half);
        let session = Session::new(
            read_half,
            Arc::clone(&writer),
            "test-peer".to_string(),
            ctx.clone(),
        );
        (client, writer, tokio::spawn(session.run()))
    }

    async fn handshake(client: &mut DuplexStream, keys: &KeyPair) -> Identity {
        let pem = encode_public_key(&keys.public_key).unwrap();
        client.write_all(&pem).await.unwrap();
        read_identity(client).await.unwrap()
    }

    async fn submit(client: &mut DuplexStream, value: i32, signature: &Signature) -> ResponseCode {
        write_submission(client, value, signature).await.unwrap();
        read_response(client).await.unwrap()
    }

    async fn submit_signed(client: &mut DuplexStream, keys: &KeyPair, value: i32) -> ResponseCode {
        let signature = sign(value, &keys.private_key).unwrap();
        submit(client, value, &signature).await
    }

    #[tokio::test]
    async fn registers_and_answers_each_submission() {
        let ctx = context(10);
        let keys = &TEST_KEYS[0];
        let (mut client, session) = spawn_session(&ctx);

        let identity = handshake(&mut client, keys).await;
        assert_eq!(identity, Identity::FIRST);

        assert_eq!(submit_signed(&mut client, keys, 2).await, ResponseCode::Accepted);
        assert_eq!(submit_signed(&mut client, keys, 2).await, ResponseCode::Duplicate);
        assert_eq!(ctx.pool.size(), 1);
        assert_eq!(ctx.pool.scoreboard().get(&identity), Some(&1));

        drop(client);
        assert_eq!(session.await.unwrap().unwrap(), SessionEnd::Disconnected);
        assert!(!ctx.registry.is_live(identity));
    }

    #[tokio::test]
    async fn forged_signature_is_rejected_without_touching_pool() {
        let ctx = context(10);
        let keys = &TEST_KEYS[0];
        let (mut client, _session) = spawn_session(&ctx);
        handshake(&mut client, keys).await;

        let signature_for_five = sign(5, &keys.private_key).unwrap();
        let code = submit(&mut client, 4, &signature_for_five).await;

        assert_eq!(code, ResponseCode::InvalidSignature);
        assert_eq!(ctx.pool.size(), 0);

        // the session carries on afterwards
        assert_eq!(submit_signed(&mut client, keys, 4).await, ResponseCode::Accepted);
    }

    #[tokio::test]
    async fn signature_from_another_key_is_rejected() {
        let ctx = context(10);
        let (mut client, _session) = spawn_session(&ctx);
        handshake(&mut client, &TEST_KEYS[0]).await;

        let code = submit_signed(&mut client, &TEST_KEYS[1], 3).await;
        assert_eq!(code, ResponseCode::InvalidSignature);
        assert_eq!(ctx.pool.size(), 0);
    }

    #[tokio::test]
    async fn garbage_key_drops_connection_without_identity() {
        let ctx = context(10);
        let (mut client, session) = spawn_session(&ctx);

        client
            .write_all(b"-----BEGIN PUBLIC KEY-----\nnot base64 at all\n-----END PUBLIC KEY-----\n")
            .await
            .unwrap();

        let result = session.await.unwrap();
        assert!(matches!(
            result,
            Err(CollectorError::Auth(AuthError::MalformedKey(_)))
        ));
        assert_eq!(ctx.registry.registered_count(), 0);

        // hard disconnect: no bytes were sent back
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn filling_the_pool_completes_and_aborts_others() {
        let ctx = context(2);
        let (mut a, session_a) = spawn_session(&ctx);
        let (mut b, session_b) = spawn_session(&ctx);
        let id_a = handshake(&mut a, &TEST_KEYS[0]).await;
        let id_b = handshake(&mut b, &TEST_KEYS[1]).await;

        assert_eq!(submit_signed(&mut a, &TEST_KEYS[0], 2).await, ResponseCode::Accepted);
        assert_eq!(submit_signed(&mut b, &TEST_KEYS[1], 3).await, ResponseCode::Completion);
        assert_eq!(read_response(&mut a).await.unwrap(), ResponseCode::Abort);

        assert_eq!(session_a.await.unwrap().unwrap(), SessionEnd::Shutdown);
        assert_eq!(session_b.await.unwrap().unwrap(), SessionEnd::Completed);

        let report = ctx.coordinator.report();
        assert_eq!(report.total(), 2);
        assert_eq!(report.scoreboard.get(&id_a), Some(&1));
        assert_eq!(report.scoreboard.get(&id_b), Some(&1));
        assert_eq!(report.triggered_by, Some(id_b));
        assert_eq!(ctx.registry.live_count(), 0);
    }

    #[tokio::test]
    async fn session_waiting_for_key_stops_on_shutdown() {
        let ctx = context(2);
        let (_client, session) = spawn_session(&ctx);

        ctx.coordinator.interrupt();
        assert_eq!(session.await.unwrap().unwrap(), SessionEnd::Shutdown);
    }

    #[tokio::test]
    async fn late_submission_to_a_full_pool_gets_only_the_abort() {
        let ctx = context(1);
        let (mut a, _session_a) = spawn_session(&ctx);
        let (mut b, session_b) = spawn_session(&ctx);
        let id_a = handshake(&mut a, &TEST_KEYS[0]).await;
        let id_b = handshake(&mut b, &TEST_KEYS[1]).await;

        // A filled the pool but has not started the shutdown yet
        assert_eq!(ctx.pool.try_admit(2, id_a), AdmitResult::Admitted { filled: true });

        let signature = sign(3, &TEST_KEYS[1].private_key).unwrap();
        write_submission(&mut b, 3, &signature).await.unwrap();
        assert!(
            timeout(Duration::from_millis(200), read_response(&mut b))
                .await
                .is_err()
        );

        let (sink, _sink_peer) = duplex(64);
        assert!(ctx.coordinator.trigger(id_a, &shared_writer(sink)).await.is_some());

        assert_eq!(read_response(&mut b).await.unwrap(), ResponseCode::Abort);
        assert_eq!(session_b.await.unwrap().unwrap(), SessionEnd::Shutdown);

        let mut rest = Vec::new();
        b.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
        assert_eq!(ctx.pool.scoreboard().get(&id_b), None);
    }

    #[tokio::test]
    async fn pending_response_is_dropped_once_aborted() {
        let ctx = context(10);
        let keys = &TEST_KEYS[0];
        let (mut client, writer, session) = spawn_session_with_writer(&ctx);
        let identity = handshake(&mut client, keys).await;
        assert_eq!(submit_signed(&mut client, keys, 2).await, ResponseCode::Accepted);

        // the broadcast claims the connection while its writer is busy
        let held = writer.lock().await;
        let registry = Arc::clone(&ctx.registry);
        let broadcast = tokio::spawn(async move {
            registry.broadcast(ResponseCode::Abort, Identity::new(99)).await
        });
        while ctx.registry.is_live(identity) {
            tokio::task::yield_now().await;
        }

        // this answer queues behind the Abort
        let signature = sign(2, &keys.private_key).unwrap();
        write_submission(&mut client, 2, &signature).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(held);
        drop(writer);

        assert_eq!(broadcast.await.unwrap(), 1);
        assert_eq!(read_response(&mut client).await.unwrap(), ResponseCode::Abort);
        assert_eq!(session.await.unwrap().unwrap(), SessionEnd::Shutdown);

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn connection_is_not_live_until_identity_is_sent() {
        let ctx = context(10);
        let keys = &TEST_KEYS[0];
        let (mut client, writer, _session) = spawn_session_with_writer(&ctx);

        let held = writer.lock().await;
        let pem = encode_public_key(&keys.public_key).unwrap();
        client.write_all(&pem).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // the key is in, but nothing can broadcast to it yet
        assert_eq!(ctx.registry.live_count(), 0);
        assert_eq!(ctx.registry.broadcast(ResponseCode::Abort, Identity::new(99)).await, 0);

        drop(held);
        drop(writer);
        assert_eq!(read_identity(&mut client).await.unwrap(), Identity::FIRST);

        assert_eq!(ctx.registry.broadcast(ResponseCode::Abort, Identity::new(99)).await, 1);
        assert_eq!(read_response(&mut client).await.unwrap(), ResponseCode::Abort);
    }
}
