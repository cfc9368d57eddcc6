use crate::store::{ConfigStore, ConfigUpdate, ContentType};

pub struct Template {
    pub title: &'static str,
    pub description: &'static str,
    pub content_type: ContentType,
}

pub const TEMPLATES: &[Template] = &[
    Template {
        title: "Blog Post",
        description: "SEO-optimized blogs",
        content_type: ContentType::Blog,
    },
    Template {
        title: "Email",
        description: "Email campaigns",
        content_type: ContentType::Email,
    },
    Template {
        title: "Social Post",
        description: "Social media content",
        content_type: ContentType::Social,
    },
    Template {
        title: "Article",
        description: "Professional article writing",
        content_type: ContentType::Article,
    },
];

#[derive(Default)]
pub struct TemplateGallery {
    pub selected: usize,
}

impl TemplateGallery {
    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % TEMPLATES.len();
    }

    pub fn select_prev(&mut self) {
        self.selected = (self.selected + TEMPLATES.len() - 1) % TEMPLATES.len();
    }

    pub fn current(&self) -> &'static Template {
        &TEMPLATES[self.selected % TEMPLATES.len()]
    }

    /// Case-insensitive lookup by title or content type name.
    pub fn find(name: &str) -> Option<usize> {
        let name = name.trim().to_ascii_lowercase();
        TEMPLATES.iter().position(|t| {
            t.title.to_ascii_lowercase() == name
                || t.title.to_ascii_lowercase().starts_with(&name)
                || format!("{:?}", t.content_type).to_ascii_lowercase() == name
        })
    }

    /// Apply the selected template to the shared config.
    pub fn apply(&self, store: &ConfigStore) -> &'static Template {
        let template = self.current();
        store.update(ConfigUpdate::ContentType(template.content_type));
        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_sets_content_type() {
        let store = ConfigStore::new();
        let mut gallery = TemplateGallery::default();
        gallery.select_next();

        let applied = gallery.apply(&store);
        assert_eq!(applied.title, "Email");
        assert_eq!(store.snapshot().content_type, ContentType::Email);
    }

    #[test]
    fn test_selection_wraps() {
        let mut gallery = TemplateGallery::default();
        gallery.select_prev();
        assert_eq!(gallery.current().title, "Article");
        gallery.select_next();
        assert_eq!(gallery.current().title, "Blog Post");
    }

    #[test]
    fn test_find_by_name() {
        assert_eq!(TemplateGallery::find("email"), Some(1));
        assert_eq!(TemplateGallery::find("Social"), Some(2));
        assert_eq!(TemplateGallery::find("blog"), Some(0));
        assert_eq!(TemplateGallery::find("podcast"), None);
    }
}
