use std::collections::HashMap;

/// Ordered class labels per output name.
///
/// Lookup never fails: outputs without labels (or indices past the end
/// of the label list) resolve to an empty string, which is what the
/// response finalizer writes for unlabeled classifications.
#[derive(Clone, Debug, Default)]
pub struct LabelProvider {
    labels: HashMap<String, Vec<String>>,
}

impl LabelProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_labels(&mut self, output: &str, labels: Vec<String>) {
        self.labels.insert(output.to_string(), labels);
    }

    pub fn label(&self, output: &str, index: usize) -> &str {
        self.labels
            .get(output)
            .and_then(|l| l.get(index))
            .map(String::as_str)
            .unwrap_or("")
    }
}
