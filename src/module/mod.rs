use crate::di::ContainerBuilder;
use crate::error::Result;

/// Trait for groups of bindings installed together
///
/// # Example
/// ```rust,ignore
/// struct TimeModule;
///
/// impl Module for TimeModule {
///     fn install(&self, builder: &mut ContainerBuilder) -> Result<()> {
///         builder.implement::<SystemClock, dyn Clock, _>(|c| c as Arc<dyn Clock>);
///         builder.bind::<dyn Clock>().to::<SystemClock>().from_new().as_singleton();
///         Ok(())
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.install(&TimeModule)?;
/// ```
pub trait Module {
    /// Register all bindings of this module
    fn install(&self, builder: &mut ContainerBuilder) -> Result<()>;

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
