use anyhow::Context;
use pbkdf2::password_hash::{PasswordHasher, SaltString};
use pbkdf2::Pbkdf2;
use rand_core::OsRng;

/// Prints a salted PBKDF2 hash for seeding the credential tables.
fn main() -> anyhow::Result<()> {
    let password = std::env::args()
        .nth(1)
        .context("Usage: hash-password <password>")?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Pbkdf2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("Failed to hash password: {}", err))?;
    println!("{}", hash);
    Ok(())
}
