use derivative::Derivative;

/// Binds a scheduled check to the exact text it was scheduled for.
///
/// A token is never cancelled. It just stops being current as soon as the live
/// input moves away from its text, and whoever holds it is expected to look.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct CheckToken {
    id: u64,
    #[derivative(Debug="ignore")]
    text: String,
}

impl CheckToken {
    pub(crate) fn new(id: u64, text: String) -> Self {
        Self { id, text }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_current(&self, live_text: &str) -> bool {
        self.text == live_text
    }
}
