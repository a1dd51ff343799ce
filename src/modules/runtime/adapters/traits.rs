//! Adapter trait definition

/// Trait for warehouse adapters
///
/// An adapter supplies the dialect-specific pieces a run needs for one
/// connector type. Adapters are shared between threads behind an `Arc`.
pub trait Adapter: Send + Sync {
    /// Registry key this adapter is stored under (the credential `type`)
    fn type_key(&self) -> &str;

    /// SQL expression returning the current timestamp
    fn date_function(&self) -> &str;

    /// Quote an identifier for this dialect
    fn quote(&self, identifier: &str) -> String;

    /// Name of the implementing type
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
