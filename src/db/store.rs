use super::loader;
use crate::templates::TemplateLibrary;
use std::sync::{Arc, OnceLock};

static BUNDLED: OnceLock<Arc<TemplateLibrary>> = OnceLock::new();

pub fn bundled() -> &'static Arc<TemplateLibrary> {
    BUNDLED.get_or_init(|| Arc::new(loader::load_bundled_library()))
}
