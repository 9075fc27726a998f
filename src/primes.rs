//! Prime generation for producers.

use rand::Rng;

/// Largest integer whose square fits in an `i32`.
const MAX_DIVISOR: i32 = 46340;

/// Trial-division primality test.
pub fn is_prime(n: i32) -> bool {
    if n < 2 {
        return false;
    }

    let mut i = 2;
    while i <= MAX_DIVISOR && i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }
    true
}

/// Draws uniformly from `[2, max]` until a prime comes up.
///
/// `max` below 2 is treated as 2.
pub fn generate_random_prime<R: Rng + ?Sized>(max: i32, rng: &mut R) -> i32 {
    let max = max.max(2);
    loop {
        let n = rng.gen_range(2..=max);
        if is_prime(n) {
            return n;
        }
    }
}
