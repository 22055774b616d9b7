//! Queries over an indexed bookshelf.

use crate::models::BookEntry;
use std::collections::BTreeSet;

/// The books of one indexing pass, in index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bookshelf {
    books: Vec<BookEntry>,
}
impl Bookshelf {
    pub fn new(books: Vec<BookEntry>) -> Self {
        Self { books }
    }

    pub fn books(&self) -> &[BookEntry] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Books whose title or any tag contains `query`, ignoring case.
    ///
    /// An empty query matches every book; whitespace is matched like any
    /// other text. Order is preserved.
    pub fn search(&self, query: &str) -> Vec<&BookEntry> {
        let query = query.to_lowercase();
        if query.is_empty() {
            return self.books.iter().collect();
        }
        self.books
            .iter()
            .filter(|book| {
                book.title.to_lowercase().contains(&query)
                    || book.tags().iter().any(|tag| tag.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// Every tag used on the shelf, de-duplicated and sorted.
    pub fn tags(&self) -> Vec<&str> {
        let tags: BTreeSet<&str> = self.books.iter().flat_map(BookEntry::tags).collect();
        tags.into_iter().collect()
    }

    /// The book stored in `folder_name`.
    pub fn find(&self, folder_name: &str) -> Option<&BookEntry> {
        self.books.iter().find(|book| book.folder_name == folder_name)
    }
}
impl From<Vec<BookEntry>> for Bookshelf {
    fn from(books: Vec<BookEntry>) -> Self {
        Self::new(books)
    }
}
impl IntoIterator for Bookshelf {
    type Item = BookEntry;
    type IntoIter = std::vec::IntoIter<BookEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.books.into_iter()
    }
}
impl<'a> IntoIterator for &'a Bookshelf {
    type Item = &'a BookEntry;
    type IntoIter = std::slice::Iter<'a, BookEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.books.iter()
    }
}
