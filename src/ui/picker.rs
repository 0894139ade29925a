use crate::core::catalog::{filter_models, ModelDescriptor};

/// Searchable model picker. `items` is the full catalog, `visible` indexes
/// the entries that match the current query.
#[derive(Debug, Clone)]
pub struct ModelPicker {
    pub query: String,
    items: Vec<ModelDescriptor>,
    visible: Vec<usize>,
    pub selected: usize,
}

impl ModelPicker {
    /// Open the picker with the cursor on `current` when it is listed.
    pub fn new(items: Vec<ModelDescriptor>, current: &str) -> Self {
        let selected = items.iter().position(|m| m.id == current).unwrap_or(0);
        let visible = (0..items.len()).collect();
        Self {
            query: String::new(),
            items,
            visible,
            selected,
        }
    }

    pub fn visible_items(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.visible.iter().filter_map(|&index| self.items.get(index))
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    /// The id Enter would choose. With nothing matching, a non-empty query
    /// is taken as a custom model id.
    pub fn selected_id(&self) -> Option<String> {
        match self.visible.get(self.selected) {
            Some(&index) => self.items.get(index).map(|m| m.id.clone()),
            None => {
                let custom = self.query.trim();
                (!custom.is_empty()).then(|| custom.to_string())
            }
        }
    }

    pub fn push_char(&mut self, c: char) {
        self.query.push(c);
        self.refilter();
    }

    pub fn pop_char(&mut self) {
        if self.query.pop().is_some() {
            self.refilter();
        }
    }

    pub fn move_up(&mut self) {
        if !self.visible.is_empty() {
            if self.selected == 0 {
                self.selected = self.visible.len() - 1;
            } else {
                self.selected -= 1;
            }
        }
    }

    pub fn move_down(&mut self) {
        if !self.visible.is_empty() {
            self.selected = (self.selected + 1) % self.visible.len();
        }
    }

    fn refilter(&mut self) {
        let previous = self
            .visible
            .get(self.selected)
            .and_then(|&index| self.items.get(index))
            .map(|m| m.id.clone());

        let matches: Vec<String> = filter_models(&self.items, &self.query)
            .into_iter()
            .map(|m| m.id.clone())
            .collect();
        self.visible = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, m)| matches.contains(&m.id))
            .map(|(index, _)| index)
            .collect();

        // Keep the cursor on the same model when it still matches.
        self.selected = previous
            .and_then(|id| {
                self.visible
                    .iter()
                    .position(|&index| self.items[index].id == id)
            })
            .unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<ModelDescriptor> {
        ["openai/gpt-4o", "anthropic/claude-sonnet-4", "openai/o3-mini"]
            .iter()
            .map(|id| ModelDescriptor::discovered(id))
            .collect()
    }

    #[test]
    fn opens_on_current_model() {
        let picker = ModelPicker::new(catalog(), "openai/o3-mini");
        assert_eq!(picker.selected_id().as_deref(), Some("openai/o3-mini"));

        let picker = ModelPicker::new(catalog(), "not/listed");
        assert_eq!(picker.selected_id().as_deref(), Some("openai/gpt-4o"));
    }

    #[test]
    fn movement_wraps_around() {
        let mut picker = ModelPicker::new(catalog(), "openai/gpt-4o");
        picker.move_up();
        assert_eq!(picker.selected_id().as_deref(), Some("openai/o3-mini"));
        picker.move_down();
        assert_eq!(picker.selected_id().as_deref(), Some("openai/gpt-4o"));
    }

    #[test]
    fn query_filters_and_keeps_cursor_when_possible() {
        let mut picker = ModelPicker::new(catalog(), "openai/o3-mini");
        for c in "OPENAI".chars() {
            picker.push_char(c);
        }
        assert_eq!(picker.visible_len(), 2);
        assert_eq!(picker.selected_id().as_deref(), Some("openai/o3-mini"));

        for _ in 0.."OPENAI".len() {
            picker.pop_char();
        }
        for c in "claude".chars() {
            picker.push_char(c);
        }
        assert_eq!(picker.visible_len(), 1);
        assert_eq!(
            picker.selected_id().as_deref(),
            Some("anthropic/claude-sonnet-4")
        );
    }

    #[test]
    fn unmatched_query_becomes_custom_id() {
        let mut picker = ModelPicker::new(catalog(), "openai/gpt-4o");
        for c in "meta/llama-4".chars() {
            picker.push_char(c);
        }
        assert_eq!(picker.visible_len(), 0);
        assert_eq!(picker.selected_id().as_deref(), Some("meta/llama-4"));
        picker.move_down();
        assert_eq!(picker.selected_id().as_deref(), Some("meta/llama-4"));
    }
}
