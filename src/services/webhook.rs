use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Value PhonePe puts in `Authorization`: hex(sha256("username:password")).
pub fn expected_authorization(username: &str, password: &str) -> String {
    hex::encode(Sha256::digest(format!("{username}:{password}").as_bytes()))
}

pub fn verify_authorization(header: Option<&str>, username: &str, password: &str) -> bool {
    let Some(provided) = header else {
        return false;
    };
    let provided = provided.trim();
    let provided = provided
        .strip_prefix("SHA256 ")
        .or_else(|| provided.strip_prefix("sha256 "))
        .unwrap_or(provided)
        .trim()
        .to_ascii_lowercase();

    let expected = expected_authorization(username, password);
    ConstantTimeEq::ct_eq(expected.as_bytes(), provided.as_bytes()).unwrap_u8() == 1
}
