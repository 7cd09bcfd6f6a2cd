use std::fmt;

#[derive(Debug, Clone)]
pub enum SnaplinkError {
    InvalidInput(String),
    NotFound(String),
    Timeout(String),
    AllocationExhausted(String),
    CodeConflict(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    CacheConnection(String),
}

impl SnaplinkError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            SnaplinkError::InvalidInput(_) => "E001",
            SnaplinkError::NotFound(_) => "E002",
            SnaplinkError::Timeout(_) => "E003",
            SnaplinkError::AllocationExhausted(_) => "E004",
            SnaplinkError::CodeConflict(_) => "E005",
            SnaplinkError::DatabaseConfig(_) => "E006",
            SnaplinkError::DatabaseConnection(_) => "E007",
            SnaplinkError::DatabaseOperation(_) => "E008",
            SnaplinkError::CacheConnection(_) => "E009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            SnaplinkError::InvalidInput(_) => "Invalid Input",
            SnaplinkError::NotFound(_) => "Resource Not Found",
            SnaplinkError::Timeout(_) => "Operation Timeout",
            SnaplinkError::AllocationExhausted(_) => "Code Allocation Exhausted",
            SnaplinkError::CodeConflict(_) => "Short Code Conflict",
            SnaplinkError::DatabaseConfig(_) => "Database Configuration Error",
            SnaplinkError::DatabaseConnection(_) => "Database Connection Error",
            SnaplinkError::DatabaseOperation(_) => "Database Operation Error",
            SnaplinkError::CacheConnection(_) => "Cache Connection Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            SnaplinkError::InvalidInput(msg) => msg,
            SnaplinkError::NotFound(msg) => msg,
            SnaplinkError::Timeout(msg) => msg,
            SnaplinkError::AllocationExhausted(msg) => msg,
            SnaplinkError::CodeConflict(msg) => msg,
            SnaplinkError::DatabaseConfig(msg) => msg,
            SnaplinkError::DatabaseConnection(msg) => msg,
            SnaplinkError::DatabaseOperation(msg) => msg,
            SnaplinkError::CacheConnection(msg) => msg,
        }
    }

    /// 是否属于内部错误（存储 / 缓存），对客户端只暴露通用信息
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            SnaplinkError::CodeConflict(_)
                | SnaplinkError::DatabaseConfig(_)
                | SnaplinkError::DatabaseConnection(_)
                | SnaplinkError::DatabaseOperation(_)
                | SnaplinkError::CacheConnection(_)
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for SnaplinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for SnaplinkError {}

// 便捷的构造函数
impl SnaplinkError {
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::InvalidInput(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::NotFound(msg.into())
    }

    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::Timeout(msg.into())
    }

    pub fn allocation_exhausted<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::AllocationExhausted(msg.into())
    }

    pub fn code_conflict<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::CodeConflict(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::DatabaseOperation(msg.into())
    }

    pub fn cache_connection<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::CacheConnection(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SnaplinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_unique() {
        let errors = [
            SnaplinkError::invalid_input("x"),
            SnaplinkError::not_found("x"),
            SnaplinkError::timeout("x"),
            SnaplinkError::allocation_exhausted("x"),
            SnaplinkError::code_conflict("x"),
            SnaplinkError::database_config("x"),
            SnaplinkError::database_connection("x"),
            SnaplinkError::database_operation("x"),
            SnaplinkError::cache_connection("x"),
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_internal_classification() {
        assert!(!SnaplinkError::invalid_input("bad").is_internal());
        assert!(!SnaplinkError::not_found("nope").is_internal());
        assert!(!SnaplinkError::timeout("slow").is_internal());
        assert!(SnaplinkError::database_operation("boom").is_internal());
        assert!(SnaplinkError::cache_connection("down").is_internal());
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = SnaplinkError::not_found("short code 'abc123' not found");
        assert_eq!(
            err.to_string(),
            "Resource Not Found: short code 'abc123' not found"
        );
    }
}
