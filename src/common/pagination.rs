// src/common/pagination.rs

use serde::{Deserialize, Serialize};

/// Tamanho fixo de página das listagens.
pub const PAGE_SIZE: i64 = 10;

// `page` chega como texto para tolerar valores inválidos (?page=abc vira a página 1)
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
}

impl PageParams {
    pub fn requested(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
}

pub fn total_pages(total: i64) -> i64 {
    if total <= 0 { 1 } else { (total + PAGE_SIZE - 1) / PAGE_SIZE }
}

/// Resolve a janela da página pedida; páginas além da última caem na última.
pub fn window(params: &PageParams, total: i64) -> PageWindow {
    let page = params.requested().min(total_pages(total));
    PageWindow { page, limit: PAGE_SIZE, offset: (page - 1) * PAGE_SIZE }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total: i64) -> Self {
        Self {
            items,
            page: window.page,
            per_page: window.limit,
            total,
            total_pages: total_pages(total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(p: &str) -> PageParams {
        PageParams { page: Some(p.to_string()) }
    }

    #[test]
    fn invalid_or_missing_page_is_first() {
        assert_eq!(PageParams::default().requested(), 1);
        assert_eq!(params("abc").requested(), 1);
        assert_eq!(params("0").requested(), 1);
        assert_eq!(params("-3").requested(), 1);
        assert_eq!(params(" 2 ").requested(), 2);
    }

    #[test]
    fn pages_never_exceed_page_size() {
        let w = window(&params("3"), 25);
        assert_eq!(w, PageWindow { page: 3, limit: 10, offset: 20 });
        assert_eq!(total_pages(25), 3);
        assert_eq!(total_pages(30), 3);
        assert_eq!(total_pages(31), 4);
    }

    #[test]
    fn page_beyond_last_is_clamped() {
        let w = window(&params("99"), 21);
        assert_eq!(w.page, 3);
        assert_eq!(w.offset, 20);
    }

    #[test]
    fn empty_listing_still_has_one_page() {
        let w = window(&params("5"), 0);
        assert_eq!(w.page, 1);
        assert_eq!(w.offset, 0);
        let page: Page<u8> = Page::new(vec![], w, 0);
        assert_eq!(page.total_pages, 1);
    }
}
