/// Key derivation for cache entries and lookup maps.
pub trait Keyable {
    fn key(&self) -> String;
    /// 含前置字元
    fn key_with_prefix(&self) -> String;
}
