//! 文件名清理
//!
//! 客户端提供的文件名只保留最后一个路径分量，`/` 与 `\` 都视为分隔符。

use crate::error::UploadError;

/// 取基本文件名，拒绝空名、`.`、`..` 以及包含 NUL 的名称
pub fn sanitize_file_name(raw: &str) -> Result<String, UploadError> {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base == "." || base == ".." || base.contains('\0') {
        return Err(UploadError::InvalidFileName(raw.to_string()));
    }

    Ok(base.to_string())
}
