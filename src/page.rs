//! Page header extraction.

use crate::error::SnippetError;
use crate::models::Page;
use crate::snippet;

/// Child elements of `<page>` that carry header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageField {
    Title,
    Id,
    Namespace,
    Restrictions,
    Redirect,
}

impl PageField {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "title" => Some(Self::Title),
            "id" => Some(Self::Id),
            "ns" => Some(Self::Namespace),
            "restrictions" => Some(Self::Restrictions),
            "redirect" => Some(Self::Redirect),
            _ => None,
        }
    }
}

/// Parses a `<page>...</page>` snippet holding only header fields.
/// Missing fields stay empty; unknown elements are ignored.
pub fn parse_page(xml: &str) -> Result<Page, SnippetError> {
    let root = snippet::parse(xml)?;
    let mut page = Page::default();

    for child in root.children {
        match PageField::from_tag(&child.name) {
            Some(PageField::Title) => page.title = child.text,
            Some(PageField::Id) => page.page_id = child.text,
            Some(PageField::Namespace) => page.namespace = child.text,
            Some(PageField::Restrictions) => page.restrictions = Some(child.text),
            Some(PageField::Redirect) => {
                page.redirects_to = child.attribute("title").map(str::to_string);
            }
            None => {}
        }
    }

    Ok(page)
}
