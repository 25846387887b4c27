/// An account that can log in with a stored credential.
pub trait Identity {
    /// Value the caller authenticates with.
    fn identifier(&self) -> &str;

    fn password_hash(&self) -> &str;

    fn roles(&self) -> Vec<String>;

    fn is_granted(&self, role: &str) -> bool {
        self.roles().iter().any(|r| r == role)
    }
}
