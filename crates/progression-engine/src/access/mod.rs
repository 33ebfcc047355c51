//! 课时内容访问控制
//!
//! 两个相互独立的判定：
//! - 可见性（`AccessResolver`）：调用方能否看到课时正文与视频
//! - 顺序锁定（`LockEvaluator`）：学员是否需要先通过上一课时的测验
//!
//! 两者都只返回布尔值，任何查询失败都按拒绝/锁定处理，从不向调用方抛错。
//! `LessonContentService` 组合两者，决定序列化给调用方的受保护字段。

mod context;
mod lock;
mod presenter;
mod resolver;

pub use context::RequestContext;
pub use lock::{LockEvaluator, Prerequisite, evaluate_prerequisite};
pub use presenter::{LessonContentService, LessonView};
pub use resolver::AccessResolver;
