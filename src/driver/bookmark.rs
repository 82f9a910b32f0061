//! Bookmarks
//!
//! 인과적 일관성 북마크와 세션 단위 보관소

use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

// ============================================================================
// Bookmark - 북마크
// ============================================================================

/// 인과적 일관성 북마크
///
/// 서버가 쓰기 후 돌려주는 불투명 토큰입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bookmark {
    value: String,
}

impl Bookmark {
    /// 새 북마크 생성
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// 북마크 값
    pub fn value(&self) -> &str {
        &self.value
    }

    /// 빈 북마크 여부
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Display for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<String> for Bookmark {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Bookmark {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// BookmarkHolder - 북마크 보관소
// ============================================================================

/// 북마크 보관소
pub trait BookmarkHolder: Send + Sync {
    /// 현재 북마크
    fn bookmark(&self) -> Option<Bookmark>;

    /// 북마크 갱신. 빈 북마크는 무시
    fn set_bookmark(&self, bookmark: Bookmark);
}

/// 세션 범위 북마크 보관소
#[derive(Debug, Default)]
pub struct DefaultBookmarkHolder {
    bookmark: RwLock<Option<Bookmark>>,
}

impl DefaultBookmarkHolder {
    /// 빈 보관소 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 초기 북마크로 생성
    pub fn with_bookmark(bookmark: Bookmark) -> Self {
        let holder = Self::new();
        holder.set_bookmark(bookmark);
        holder
    }
}

impl BookmarkHolder for DefaultBookmarkHolder {
    fn bookmark(&self) -> Option<Bookmark> {
        self.bookmark.read().clone()
    }

    fn set_bookmark(&self, bookmark: Bookmark) {
        if !bookmark.is_empty() {
            *self.bookmark.write() = Some(bookmark);
        }
    }
}

/// 아무것도 보관하지 않는 보관소 (트랜잭션 범위 스트림용)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpBookmarkHolder;

impl BookmarkHolder for NoOpBookmarkHolder {
    fn bookmark(&self) -> Option<Bookmark> {
        None
    }

    fn set_bookmark(&self, _bookmark: Bookmark) {}
}

// ============================================================================
// Tests
// ============================================================================
