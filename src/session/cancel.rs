//! # 可撤销注册上下文
//!
//! ## 设计思路
//!
//! 每个会话持有一个 `CancellationScope`，所有依附该会话的监听与回调
//! 在注册时领取一个令牌。作用域被取消后，持旧令牌的回调全部失效，
//! 新会话在全新令牌下注册，无需手工逐个清理。
//!
//! 取消是协作式且粗粒度的：它让回调失效，但不中断已经发起的网络调用，
//! 被替代的上传会跑完，只是结果不再被接入新会话。

use tokio_util::sync::CancellationToken;

/// 会话级撤销作用域。同一时刻全局至多一个处于活跃状态。
#[derive(Debug)]
pub struct CancellationScope {
    token: CancellationToken,
}

impl CancellationScope {
    /// 分配全新作用域。
    pub fn fresh() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// 领取当前令牌。注册监听或需要在挂起点后校验归属时使用。
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 同步使当前令牌失效。已领取该令牌的回调全部变为惰性。
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// 取消并透明重新分配：`cancel()` 后换上干净令牌。
    pub fn reset(&mut self) {
        self.token.cancel();
        self.token = CancellationToken::new();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Default for CancellationScope {
    fn default() -> Self {
        Self::fresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_scope_is_not_cancelled() {
        let scope = CancellationScope::fresh();
        assert!(!scope.is_cancelled());
        assert!(!scope.token().is_cancelled());
    }

    #[test]
    fn cancel_invalidates_issued_tokens() {
        let scope = CancellationScope::fresh();
        let token = scope.token();
        scope.cancel();
        assert!(token.is_cancelled());
        assert!(scope.is_cancelled());
    }

    #[test]
    fn reset_replaces_token_after_cancelling() {
        let mut scope = CancellationScope::fresh();
        let old_token = scope.token();
        scope.reset();

        assert!(old_token.is_cancelled());
        assert!(!scope.is_cancelled());
        assert!(!scope.token().is_cancelled());
    }
}
