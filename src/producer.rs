//! Producer side of the protocol
//!
//! Registers a fresh key pair with the collector, then submits signed random
//! primes until the collector says stop.

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::auth::{KeyPair, Signature, encode_public_key, generate_key_pair, sign};
use crate::client::Identity;
use crate::error::CollectorError;
use crate::primes::generate_random_prime;
use crate::protocol::{ResponseCode, read_identity, read_response, write_submission};

/// Tally of the collector's answers to one producer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    pub accepted: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

impl ProducerStats {
    fn record(&mut self, code: ResponseCode) {
        match code {
            ResponseCode::Accepted | ResponseCode::Completion => self.accepted += 1,
            ResponseCode::Duplicate => self.duplicates += 1,
            ResponseCode::InvalidSignature => self.invalid += 1,
            ResponseCode::Abort => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerOutcome {
    pub identity: Identity,
    pub stats: ProducerStats,
    /// Completion or Abort.
    pub final_code: ResponseCode,
}

/// A registered connection to the collector.
pub struct Producer<S> {
    stream: S,
    keys: KeyPair,
    identity: Identity,
}

impl Producer<TcpStream> {
    /// Connects to `addr` and registers a freshly generated key pair.
    pub async fn connect(addr: &str) -> Result<Self, CollectorError> {
        let stream = TcpStream::connect(addr).await?;
        let keys = tokio::task::spawn_blocking(generate_key_pair)
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))??;
        Self::register(stream, keys).await
    }
}

impl<S> Producer<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends the public key and waits for the assigned identity.
    pub async fn register(mut stream: S, keys: KeyPair) -> Result<Self, CollectorError> {
        let pem = encode_public_key(&keys.public_key)?;
        stream.write_all(&pem).await?;
        stream.flush().await?;

        let identity = read_identity(&mut stream).await?;
        info!("Client ID: {}", identity);

        Ok(Self {
            stream,
            keys,
            identity,
        })
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Sends one (value, signature) pair and returns the collector's answer.
    ///
    /// The signature is sent as given, so callers can submit forged ones.
    pub async fn submit(
        &mut self,
        value: i32,
        signature: &Signature,
    ) -> Result<ResponseCode, CollectorError> {
        write_submission(&mut self.stream, value, signature).await?;
        read_response(&mut self.stream).await
    }

    /// Reads a code without submitting first, i.e. an Abort broadcast.
    pub async fn read_code(&mut self) -> Result<ResponseCode, CollectorError> {
        read_response(&mut self.stream).await
    }

    /// Signs and submits `value`.
    pub async fn submit_value(&mut self, value: i32) -> Result<ResponseCode, CollectorError> {
        let signature = sign(value, &self.keys.private_key)?;
        self.submit(value, &signature).await
    }

    /// Submits random primes up to `max_value` until told to stop.
    ///
    /// The generator is seeded with the identity so producers walk different
    /// sequences.
    pub async fn run(mut self, max_value: i32) -> Result<ProducerOutcome, CollectorError> {
        let mut rng = StdRng::seed_from_u64(self.identity.as_i32() as u64);
        let mut stats = ProducerStats::default();

        loop {
            let value = generate_random_prime(max_value, &mut rng);
            let code = self.submit_value(value).await?;
            stats.record(code);

            match code {
                ResponseCode::Accepted => debug!("Sent {}: successfully added", value),
                ResponseCode::Duplicate => debug!("Sent {}: rejected (duplicate)", value),
                ResponseCode::InvalidSignature => {
                    debug!("Sent {}: rejected (invalid signature)", value)
                }
                ResponseCode::Completion => {
                    info!("Sent {}: successfully added (completing collection)", value)
                }
                ResponseCode::Abort => info!("Server has collected all numbers, exiting"),
            }

            if code.is_terminal() {
                return Ok(ProducerOutcome {
                    identity: self.identity,
                    stats,
                    final_code: code,
                });
            }
        }
    }
}
