//! 文件完整性校验
//!
//! 以固定缓冲区流式计算 SHA-256，不会把整个文件读入内存。

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// 读取缓冲区大小
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// 计算文件的 SHA-256，返回小写十六进制字符串
pub async fn digest_file(path: impl AsRef<Path>) -> std::io::Result<String> {
    let mut file = File::open(path.as_ref()).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// 计算内存数据的 SHA-256
pub fn digest_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// 比较客户端声明的摘要与实际摘要（忽略大小写和首尾空白）
pub fn digests_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256("hello world")
    const HELLO_DIGEST: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_digest_bytes() {
        assert_eq!(digest_bytes(b"hello world"), HELLO_DIGEST);
    }

    #[tokio::test]
    async fn test_digest_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        assert_eq!(digest_file(&path).await.unwrap(), HELLO_DIGEST);
    }

    #[tokio::test]
    async fn test_digest_file_larger_than_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..READ_BUFFER_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        tokio::fs::write(&path, &data).await.unwrap();

        assert_eq!(digest_file(&path).await.unwrap(), digest_bytes(&data));
    }

    #[tokio::test]
    async fn test_digest_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = digest_file(dir.path().join("absent")).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_digests_match_ignores_case() {
        assert!(digests_match(&HELLO_DIGEST.to_uppercase(), HELLO_DIGEST));
        assert!(digests_match(&format!(" {HELLO_DIGEST}\n"), HELLO_DIGEST));
        assert!(!digests_match("deadbeef", HELLO_DIGEST));
    }
}
