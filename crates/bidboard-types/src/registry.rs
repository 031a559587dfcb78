//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each pluggable implementation (storage backends today) exposes a Registry
/// struct declaring the name it is configured under and its factory.
pub trait ImplementationRegistry {
	/// Name used in configuration, e.g. "memory" for
	/// `[storage.implementations.memory]`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	fn factory() -> Self::Factory;
}
