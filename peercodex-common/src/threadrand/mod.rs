use rand::rngs::OsRng;
use rand::{CryptoRng, Rng, RngCore};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::cell::UnsafeCell;

thread_local! {
    static RNG: UnsafeCell<ChaCha20Rng> = UnsafeCell::new(ChaCha20Rng::from_seed(OsRng.gen()));
}

/// A ChaCha20 CSPRNG seeded from the OS, one per thread. Used for OTPs and for unique values
/// in tests.
pub struct SecureRng;

impl SecureRng {
    pub fn next_u8() -> u8 {
        RNG.with(|rng| {
            // Only one thread accesses this RNG so this is safe
            unsafe { RngCore::next_u32(&mut *rng.get()) as u8 }
        })
    }

    pub fn next_u128() -> u128 {
        RNG.with(|rng| {
            // Only one thread accesses this RNG so this is safe
            let rng_ref = unsafe { &mut *rng.get() };
            let mut bytes = [0u8; 16];
            RngCore::fill_bytes(rng_ref, &mut bytes);
            u128::from_le_bytes(bytes)
        })
    }
}

impl RngCore for SecureRng {
    fn next_u32(&mut self) -> u32 {
        RNG.with(|rng| unsafe { RngCore::next_u32(&mut *rng.get()) })
    }

    fn next_u64(&mut self) -> u64 {
        RNG.with(|rng| unsafe { RngCore::next_u64(&mut *rng.get()) })
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        RNG.with(|rng| unsafe { RngCore::fill_bytes(&mut *rng.get(), dest) })
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        // Infallible for ChaCha20Rng
        RNG.with(|rng| unsafe { RngCore::fill_bytes(&mut *rng.get(), dest) });
        Ok(())
    }
}

impl CryptoRng for SecureRng {}
