pub mod ip;
pub mod url_validator;

/// 短码字母表：大小写字母 + 数字，共 62 个字符
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// 生成指定长度的随机短码
///
/// 随机源为 `rand` 的线程本地 CSPRNG，每个字符在字母表上均匀分布。
/// 唯一性只是概率上的，冲突由调用方检测。
pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    iter::repeat_with(|| CODE_ALPHABET[rand::random_range(0..CODE_ALPHABET.len())] as char)
        .take(length)
        .collect()
}

/// 路由层用于提前拒绝明显不是短码的路径
pub fn is_valid_short_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= 32 && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_random_code_length_and_alphabet() {
        for length in [0, 1, 6, 7, 8, 32] {
            let code = generate_random_code(length);
            assert_eq!(code.len(), length);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_generate_random_code_is_not_constant() {
        let codes: HashSet<String> = (0..100).map(|_| generate_random_code(6)).collect();
        // 62^6 的空间里 100 次抽样几乎不可能全部撞上
        assert!(codes.len() > 95);
    }

    #[test]
    fn test_alphabet_has_62_distinct_chars() {
        let set: HashSet<u8> = CODE_ALPHABET.iter().copied().collect();
        assert_eq!(set.len(), 62);
    }

    #[test]
    fn test_is_valid_short_code() {
        assert!(is_valid_short_code("abc123"));
        assert!(is_valid_short_code("ZZZZZZZZ"));
        assert!(!is_valid_short_code(""));
        assert!(!is_valid_short_code("has-dash"));
        assert!(!is_valid_short_code("api/stats"));
        assert!(!is_valid_short_code(&"a".repeat(33)));
    }
}
