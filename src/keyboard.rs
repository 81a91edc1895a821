//! 键位命令表模块
//!
//! # 设计思路
//!
//! 修饰键 + 字母的组合映射到四种动作，集中在一张显式绑定表里，
//! 不在各处散落字符串分支。无活跃会话时的无操作语义由分发器的
//! 前置条件统一兜底，这里只做查表。

use crate::dispatch::Action;

/// 一个修饰键组合。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCombo {
    pub ctrl: bool,
    pub key: char,
}

impl KeyCombo {
    pub fn ctrl(key: char) -> Self {
        Self { ctrl: true, key }
    }

    /// 解析 `"ctrl+b"` 形式的组合描述。
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        let (modifier, key) = raw.split_once('+')?;
        if modifier != "ctrl" {
            return None;
        }

        let mut chars = key.chars();
        let key = chars.next()?;
        if chars.next().is_some() || !key.is_ascii_alphabetic() {
            return None;
        }

        Some(Self { ctrl: true, key })
    }
}

/// 键位 → 动作绑定表。
pub struct Keymap {
    bindings: Vec<(KeyCombo, Action)>,
}

impl Default for Keymap {
    fn default() -> Self {
        Self {
            bindings: vec![
                (KeyCombo::ctrl('b'), Action::Download),
                (KeyCombo::ctrl('d'), Action::RawDownload),
                (KeyCombo::ctrl('y'), Action::Upload),
                (KeyCombo::ctrl('k'), Action::ClipboardCopy),
            ],
        }
    }
}

impl Keymap {
    pub fn action_for(&self, combo: KeyCombo) -> Option<Action> {
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == combo)
            .map(|(_, action)| *action)
    }
}
