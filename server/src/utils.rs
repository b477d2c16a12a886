use rand::Rng;
use shared::PlayerId;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 8;

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    (millis.min(u64::MAX as u128)) as u64
}

// Draw a random lowercase base-36 player identity
pub fn random_player_id<R: Rng + ?Sized>(rng: &mut R) -> PlayerId {
    let token: String = (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    PlayerId::new(token)
}
