//! # Template Catalog
//!
//! The templates a site can be built from, and the fixed set of pages each
//! one provides. A site's persisted page map is always completed against
//! this enumeration on save.

use crate::errors::{TemplateError, TemplateResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Buffered HTML per page, in page order
pub type PageMap = IndexMap<PageKey, String>;

/// Stable identifier of one page within a template (`home`, `about`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageKey(String);

impl PageKey {
    pub const HOME: &'static str = "home";

    /// Normalize and validate a page key.
    ///
    /// Keys are lowercased and the legacy aliases `index`, `course_detail`
    /// and `coursedetail` map to `home` and `course-detail`.
    pub fn parse(raw: &str) -> TemplateResult<Self> {
        let key = raw.trim().to_ascii_lowercase();
        let key = match key.as_str() {
            "index" => Self::HOME.to_string(),
            "course_detail" | "coursedetail" => "course-detail".to_string(),
            _ => key,
        };

        let valid = !key.is_empty()
            && !key.starts_with('-')
            && !key.ends_with('-')
            && key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(TemplateError::InvalidPageKey(raw.to_string()));
        }
        Ok(Self(key))
    }

    pub fn home() -> Self {
        Self(Self::HOME.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_home(&self) -> bool {
        self.0 == Self::HOME
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PageKey {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PageKey {
    type Error = TemplateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PageKey> for String {
    fn from(key: PageKey) -> Self {
        key.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDescriptor {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    /// Asset root of the template, e.g. `/templates/modern-minimal/`
    pub base_path: String,

    /// Page key to file name, in page order
    pub pages: IndexMap<PageKey, String>,
}

impl TemplateDescriptor {
    pub fn file_for(&self, page: &PageKey) -> TemplateResult<&str> {
        self.pages
            .get(page)
            .map(String::as_str)
            .ok_or_else(|| TemplateError::UnknownPage {
                template: self.id.clone(),
                page: page.clone(),
            })
    }

    pub fn has_page(&self, page: &PageKey) -> bool {
        self.pages.contains_key(page)
    }

    pub fn page_keys(&self) -> impl Iterator<Item = &PageKey> {
        self.pages.keys()
    }

    /// Page shown when a site is first opened
    pub fn landing_page(&self) -> Option<&PageKey> {
        let home = PageKey::home();
        self.pages
            .get_key_value(&home)
            .map(|(key, _)| key)
            .or_else(|| self.pages.keys().next())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateCatalog {
    templates: Vec<TemplateDescriptor>,
}

const BUILTIN: &[(&str, &str, &str, &str)] = &[
    (
        "modern-minimal",
        "Modern Minimal",
        "Education",
        "Clean, minimal design with focus on typography and simplicity",
    ),
    (
        "creative-pro",
        "Creative Pro",
        "Education",
        "Creative course marketplace design",
    ),
    (
        "academic-pro",
        "Academic Pro",
        "Education",
        "Professional academic course platform",
    ),
    (
        "fitness-gym",
        "Elite Fitness Academy",
        "Fitness",
        "Professional strength training academy with dark theme and vertical layout",
    ),
    (
        "fitness-personal",
        "FitCoach Pro",
        "Fitness",
        "Personal training services with organic green theme and asymmetric layout",
    ),
    (
        "fitness-yoga",
        "Mindful Movement Studio",
        "Fitness",
        "Yoga and wellness studio with ethereal purple theme and circular masonry layout",
    ),
    (
        "finance-investment",
        "WealthMaster",
        "Financial",
        "Professional investment education platform",
    ),
    (
        "finance-banking",
        "BankPro Academy",
        "Financial",
        "Banking and finance career training template",
    ),
    (
        "finance-crypto",
        "CryptoLearn",
        "Financial",
        "Cryptocurrency and blockchain education platform",
    ),
];

const STANDARD_PAGES: &[(&str, &str)] = &[
    ("home", "index.html"),
    ("about", "about.html"),
    ("courses", "courses.html"),
    ("contact", "contact.html"),
    ("signin", "signin.html"),
    ("register", "register.html"),
    ("course-detail", "course-detail.html"),
];

impl TemplateCatalog {
    pub fn new(templates: Vec<TemplateDescriptor>) -> Self {
        Self { templates }
    }

    /// The templates shipped with the builder
    pub fn builtin() -> Self {
        let pages: IndexMap<PageKey, String> = STANDARD_PAGES
            .iter()
            .map(|(key, file)| (PageKey(key.to_string()), file.to_string()))
            .collect();

        let templates = BUILTIN
            .iter()
            .map(|(id, name, category, description)| TemplateDescriptor {
                id: id.to_string(),
                name: name.to_string(),
                category: category.to_string(),
                description: description.to_string(),
                thumbnail: None,
                base_path: format!("/templates/{}/", id),
                pages: pages.clone(),
            })
            .collect();
        Self { templates }
    }

    pub fn from_json(source: &str) -> TemplateResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn get(&self, id: &str) -> TemplateResult<&TemplateDescriptor> {
        self.templates
            .iter()
            .find(|template| template.id == id)
            .ok_or_else(|| TemplateError::UnknownTemplate(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.iter().any(|template| template.id == id)
    }

    /// Site ids are minted as `<template-id>-<suffix>`; recover the template.
    /// The longest matching id wins so `fitness-gym-2` never resolves to a
    /// shorter prefix.
    pub fn infer_from_site_id(&self, site_id: &str) -> Option<&TemplateDescriptor> {
        self.templates
            .iter()
            .filter(|template| site_id.contains(template.id.as_str()))
            .max_by_key(|template| template.id.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemplateDescriptor> {
        self.templates.iter()
    }

    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a TemplateDescriptor> {
        self.templates
            .iter()
            .filter(move |template| template.category.eq_ignore_ascii_case(category))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_page_key_aliases() {
        assert_eq!(PageKey::parse("index").unwrap(), PageKey::home());
        assert_eq!(PageKey::parse(" Home ").unwrap().as_str(), "home");
        assert_eq!(PageKey::parse("course_detail").unwrap().as_str(), "course-detail");
        assert_eq!(PageKey::parse("coursedetail").unwrap().as_str(), "course-detail");
    }

    #[test]
    fn test_page_key_rejects_garbage() {
        for raw in ["", "  ", "about us", "../etc", "-about", "a/b"] {
            assert!(
                matches!(PageKey::parse(raw), Err(TemplateError::InvalidPageKey(_))),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_page_key_serde_is_a_plain_string() {
        let key: PageKey = serde_json::from_str(r#""index""#).unwrap();
        assert!(key.is_home());
        assert_eq!(serde_json::to_string(&key).unwrap(), r#""home""#);
        assert!(serde_json::from_str::<PageKey>(r#""no way""#).is_err());
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = TemplateCatalog::builtin();
        assert_eq!(catalog.len(), 9);

        let template = catalog.get("fitness-yoga").unwrap();
        assert_eq!(template.base_path, "/templates/fitness-yoga/");
        assert_eq!(template.file_for(&PageKey::home()).unwrap(), "index.html");
        assert_eq!(
            template.file_for(&"course-detail".parse().unwrap()).unwrap(),
            "course-detail.html"
        );
        let keys: Vec<&str> = template.page_keys().map(PageKey::as_str).collect();
        assert_eq!(
            keys,
            vec!["home", "about", "courses", "contact", "signin", "register", "course-detail"]
        );
        assert_eq!(catalog.by_category("fitness").count(), 3);
    }

    #[test]
    fn test_unknown_lookups() {
        let catalog = TemplateCatalog::builtin();
        assert!(matches!(
            catalog.get("ngo-charity"),
            Err(TemplateError::UnknownTemplate(id)) if id == "ngo-charity"
        ));

        let template = catalog.get("modern-minimal").unwrap();
        let blog = PageKey::parse("blog").unwrap();
        assert!(matches!(template.file_for(&blog), Err(TemplateError::UnknownPage { .. })));
    }

    #[test]
    fn test_infer_from_site_id() {
        let catalog = TemplateCatalog::builtin();
        assert_eq!(
            catalog.infer_from_site_id("fitness-gym-1712345").map(|t| t.id.as_str()),
            Some("fitness-gym")
        );
        assert!(catalog.infer_from_site_id("site-42").is_none());
    }

    #[test]
    fn test_catalog_from_json() {
        let catalog = TemplateCatalog::from_json(
            r#"{
                "templates": [{
                    "id": "tiny",
                    "name": "Tiny",
                    "category": "Test",
                    "basePath": "/templates/tiny/",
                    "pages": { "index": "index.html", "about": "about.html" }
                }]
            }"#,
        )
        .unwrap();

        let template = catalog.get("tiny").unwrap();
        assert_eq!(template.landing_page(), Some(&PageKey::home()));
        assert!(template.has_page(&PageKey::parse("about").unwrap()));
        assert!(template.thumbnail.is_none());
    }
}
