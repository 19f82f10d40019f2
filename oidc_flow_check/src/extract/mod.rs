mod form;
mod query;

pub use form::{Form, FormMethod, extract_form, extract_forms};
pub use query::extract_query_params;

pub(crate) use form::is_auto_submitting;
