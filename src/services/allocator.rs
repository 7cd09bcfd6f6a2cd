//! 唯一短码分配
//!
//! 从起始长度开始，每个长度最多尝试 `attempts_per_length` 次
//! "生成候选 → 查询是否占用"，仍失败就把长度加一，最多加 `extra_lengths` 轮。
//!
//! 检查与插入不是原子的；并发下两个分配者可能拿到同一个候选，
//! 由存储层的唯一约束兜底，输掉的一方收到 `CodeConflict` 后重新分配。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::config::AllocatorConfig;
use crate::errors::{Result, SnaplinkError};
use crate::utils::generate_random_code;

/// 短码占用查询
#[async_trait]
pub trait CodeRegistry: Send + Sync {
    async fn code_exists(&self, code: &str) -> Result<bool>;
}

/// 候选短码生成函数，参数为长度
pub type CodeGenerator = Arc<dyn Fn(usize) -> String + Send + Sync>;

#[derive(Clone)]
pub struct CodeAllocator {
    registry: Arc<dyn CodeRegistry>,
    policy: AllocatorConfig,
    generator: CodeGenerator,
}

impl CodeAllocator {
    pub fn new(registry: Arc<dyn CodeRegistry>, policy: AllocatorConfig) -> Self {
        Self {
            registry,
            policy,
            generator: Arc::new(generate_random_code),
        }
    }

    /// 替换候选生成函数
    pub fn with_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(usize) -> String + Send + Sync + 'static,
    {
        self.generator = Arc::new(generator);
        self
    }

    pub fn policy(&self) -> &AllocatorConfig {
        &self.policy
    }

    /// 分配一个当前未被占用的短码
    ///
    /// 所有长度和尝试次数用尽时返回 `AllocationExhausted`，调用方不应再透明重试。
    pub async fn allocate(&self) -> Result<String> {
        let first = self.policy.start_length.max(1);
        let last = first + self.policy.extra_lengths;

        for length in first..=last {
            for attempt in 1..=self.policy.attempts_per_length {
                let candidate = (self.generator)(length);
                if !self.registry.code_exists(&candidate).await? {
                    return Ok(candidate);
                }
                debug!(
                    "Short code collision on '{}' (length {}, attempt {}/{})",
                    candidate, length, attempt, self.policy.attempts_per_length
                );
            }
            debug!("Widening short code length to {}", length + 1);
        }

        error!(
            "Short code allocation exhausted: lengths {}..={}, {} attempts each",
            first, last, self.policy.attempts_per_length
        );
        Err(SnaplinkError::allocation_exhausted(format!(
            "No free short code found with lengths {} to {}",
            first, last
        )))
    }
}
