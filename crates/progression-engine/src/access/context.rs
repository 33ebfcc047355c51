//! 请求上下文

use std::collections::HashMap;

use crate::models::Principal;

/// 单次逻辑请求的上下文
///
/// 携带调用方身份和课程级访问结果缓存（course_id -> 是否允许）。
/// 每个请求新建一个，请求结束即丢弃；不实现 `Clone`，
/// 缓存不会被带到其他请求或其他调用方。
#[derive(Debug, Default)]
pub struct RequestContext {
    principal: Option<Principal>,
    access_memo: HashMap<i64, bool>,
}

impl RequestContext {
    pub fn new(principal: Option<Principal>) -> Self {
        Self {
            principal,
            access_memo: HashMap::new(),
        }
    }

    /// 匿名请求
    pub fn anonymous() -> Self {
        Self::new(None)
    }

    pub fn for_principal(principal: Principal) -> Self {
        Self::new(Some(principal))
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub(crate) fn cached_access(&self, course_id: i64) -> Option<bool> {
        self.access_memo.get(&course_id).copied()
    }

    pub(crate) fn remember_access(&mut self, course_id: i64, allowed: bool) {
        self.access_memo.insert(course_id, allowed);
    }

    /// 已缓存的课程数
    pub fn memoized_courses(&self) -> usize {
        self.access_memo.len()
    }
}
