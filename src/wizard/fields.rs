//! Input widgets used by the wizard: a single-line text field and a
//! single-choice list. Both are plain state; rendering lives in `ui`.

/// Single-line text input
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextField {
    value: String,
    masked: bool,
    placeholder: &'static str,
}

impl TextField {
    pub fn new(placeholder: &'static str) -> Self {
        Self {
            value: String::new(),
            masked: false,
            placeholder,
        }
    }

    /// Password field: rendered as asterisks
    pub fn masked(placeholder: &'static str) -> Self {
        Self {
            masked: true,
            ..Self::new(placeholder)
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn is_masked(&self) -> bool {
        self.masked
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Text to draw: asterisks for masked fields
    pub fn display_value(&self) -> String {
        if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }

    /// Control characters never enter the buffer
    pub fn push(&mut self, c: char) {
        if !c.is_control() {
            self.value.push(c);
        }
    }

    pub fn pop(&mut self) {
        self.value.pop();
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }
}

/// Vertical list with one highlighted item
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChoiceList {
    items: Vec<String>,
    highlighted: usize,
}

impl ChoiceList {
    pub const PAGE: usize = 10;

    pub fn new(items: Vec<String>) -> Self {
        Self {
            items,
            highlighted: 0,
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    pub fn selected(&self) -> Option<&str> {
        self.items.get(self.highlighted).map(String::as_str)
    }

    pub fn up(&mut self) {
        self.highlighted = self.highlighted.saturating_sub(1);
    }

    pub fn down(&mut self) {
        if self.highlighted + 1 < self.items.len() {
            self.highlighted += 1;
        }
    }

    pub fn page_up(&mut self) {
        self.highlighted = self.highlighted.saturating_sub(Self::PAGE);
    }

    pub fn page_down(&mut self) {
        self.highlighted = (self.highlighted + Self::PAGE).min(self.items.len().saturating_sub(1));
    }

    pub fn home(&mut self) {
        self.highlighted = 0;
    }

    pub fn end(&mut self) {
        self.highlighted = self.items.len().saturating_sub(1);
    }

    /// Highlight the first item equal to `label`. Returns false if absent.
    pub fn highlight(&mut self, label: &str) -> bool {
        match self.items.iter().position(|i| i == label) {
            Some(index) => {
                self.highlighted = index;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_field_editing() {
        let mut field = TextField::new("hostname");
        assert!(field.is_blank());
        for c in "arch".chars() {
            field.push(c);
        }
        field.push('\n');
        field.pop();
        assert_eq!(field.value(), "arc");
        field.clear();
        assert!(field.is_blank());
    }

    #[test]
    fn test_masked_display() {
        let field = TextField::masked("password").with_value("hünter2");
        assert_eq!(field.display_value(), "*******");
        assert_eq!(field.value(), "hünter2");
    }

    #[test]
    fn test_choice_list_bounds() {
        let mut list = ChoiceList::new(vec!["Yes".into(), "No".into()]);
        list.up();
        assert_eq!(list.selected(), Some("Yes"));
        list.down();
        list.down();
        assert_eq!(list.selected(), Some("No"));
        list.page_up();
        assert_eq!(list.highlighted(), 0);
        list.end();
        assert_eq!(list.highlighted(), 1);
    }

    #[test]
    fn test_empty_choice_list() {
        let mut list = ChoiceList::new(vec![]);
        list.down();
        list.page_down();
        list.end();
        assert_eq!(list.selected(), None);
    }

    #[test]
    fn test_highlight_by_label() {
        let mut list = ChoiceList::new(vec!["GPT".into(), "EFI".into()]);
        assert!(list.highlight("EFI"));
        assert_eq!(list.highlighted(), 1);
        assert!(!list.highlight("LVM"));
    }
}
