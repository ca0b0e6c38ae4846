use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortenerError {
    NotUnique(String),
    NotFound(String),
    Deleted(String),
    AuthenticationFailed(String),
    InvalidCharacter(String),
    Canceled(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Serialization(String),
    Validation(String),
    PipelineClosed(String),
}

/// 认证失败的统一提示，不区分失败阶段
pub const AUTHENTICATION_FAILED: &str = "authentication failed";

impl ShortenerError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ShortenerError::NotUnique(_) => "E001",
            ShortenerError::NotFound(_) => "E002",
            ShortenerError::Deleted(_) => "E003",
            ShortenerError::AuthenticationFailed(_) => "E004",
            ShortenerError::InvalidCharacter(_) => "E005",
            ShortenerError::Canceled(_) => "E006",
            ShortenerError::DatabaseConfig(_) => "E007",
            ShortenerError::DatabaseConnection(_) => "E008",
            ShortenerError::DatabaseOperation(_) => "E009",
            ShortenerError::FileOperation(_) => "E010",
            ShortenerError::Serialization(_) => "E011",
            ShortenerError::Validation(_) => "E012",
            ShortenerError::PipelineClosed(_) => "E013",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ShortenerError::NotUnique(_) => "Not Unique",
            ShortenerError::NotFound(_) => "Resource Not Found",
            ShortenerError::Deleted(_) => "Resource Deleted",
            ShortenerError::AuthenticationFailed(_) => "Authentication Failed",
            ShortenerError::InvalidCharacter(_) => "Invalid Character",
            ShortenerError::Canceled(_) => "Operation Canceled",
            ShortenerError::DatabaseConfig(_) => "Database Configuration Error",
            ShortenerError::DatabaseConnection(_) => "Database Connection Error",
            ShortenerError::DatabaseOperation(_) => "Database Operation Error",
            ShortenerError::FileOperation(_) => "File Operation Error",
            ShortenerError::Serialization(_) => "Serialization Error",
            ShortenerError::Validation(_) => "Validation Error",
            ShortenerError::PipelineClosed(_) => "Deletion Pipeline Closed",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ShortenerError::NotUnique(msg) => msg,
            ShortenerError::NotFound(msg) => msg,
            ShortenerError::Deleted(msg) => msg,
            ShortenerError::AuthenticationFailed(msg) => msg,
            ShortenerError::InvalidCharacter(msg) => msg,
            ShortenerError::Canceled(msg) => msg,
            ShortenerError::DatabaseConfig(msg) => msg,
            ShortenerError::DatabaseConnection(msg) => msg,
            ShortenerError::DatabaseOperation(msg) => msg,
            ShortenerError::FileOperation(msg) => msg,
            ShortenerError::Serialization(msg) => msg,
            ShortenerError::Validation(msg) => msg,
            ShortenerError::PipelineClosed(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于启动失败等终端场景）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ShortenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShortenerError {}

// 便捷的构造函数
impl ShortenerError {
    pub fn not_unique<T: Into<String>>(msg: T) -> Self {
        ShortenerError::NotUnique(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ShortenerError::NotFound(msg.into())
    }

    pub fn deleted<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Deleted(msg.into())
    }

    /// 认证失败只有一种对外形态
    pub fn authentication_failed() -> Self {
        ShortenerError::AuthenticationFailed(AUTHENTICATION_FAILED.to_string())
    }

    pub fn invalid_character<T: Into<String>>(msg: T) -> Self {
        ShortenerError::InvalidCharacter(msg.into())
    }

    pub fn canceled<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Canceled(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Serialization(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Validation(msg.into())
    }

    pub fn pipeline_closed<T: Into<String>>(msg: T) -> Self {
        ShortenerError::PipelineClosed(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ShortenerError {
    fn from(err: sea_orm::DbErr) -> Self {
        ShortenerError::DatabaseOperation(format!("db: {}", err))
    }
}

impl From<std::io::Error> for ShortenerError {
    fn from(err: std::io::Error) -> Self {
        ShortenerError::FileOperation(format!("file: {}", err))
    }
}

impl From<serde_json::Error> for ShortenerError {
    fn from(err: serde_json::Error) -> Self {
        ShortenerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShortenerError>;
