use proc_macro::TokenStream;

mod injectable;

/// Derive macro implementing `bindwire::Injectable` for a struct
///
/// Every named field is filled from the container according to its type:
///
/// | field type          | injection                                   |
/// |---------------------|---------------------------------------------|
/// | `Arc<T>`            | required single instance                    |
/// | `Option<Arc<T>>`    | optional single instance                    |
/// | `Vec<Arc<T>>`       | every matching instance                     |
/// | `Lazy<T>`           | resolved on first `get`                     |
///
/// `#[inject(id = "...")]` selects a binding identifier and
/// `#[inject(skip)]` leaves the field at `Default::default()`.
///
/// # Example
/// ```ignore
/// use bindwire::prelude::*;
///
/// #[derive(Injectable)]
/// pub struct Greeter {
///     clock: Arc<dyn Clock>,
///     #[inject(id = "formal")]
///     salutation: Arc<String>,
///     plugins: Vec<Arc<dyn Plugin>>,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    injectable::derive_injectable(input)
}
