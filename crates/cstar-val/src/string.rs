pub use ecow::EcoString as CstStr;

pub static CSTR_EMPTY: CstStr = CstStr::new();

pub trait StrExt {
    /// Strip one leading and one trailing occurrence of `c`, if present.
    fn unquote(&self, c: char) -> CstStr;
}

impl StrExt for CstStr {
    fn unquote(&self, c: char) -> CstStr {
        let s = self.as_str();
        let s = s.strip_prefix(c).unwrap_or(s);
        let s = s.strip_suffix(c).unwrap_or(s);
        CstStr::from(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cstr_as_hash_key() {
        use std::collections::HashMap;

        let mut map: HashMap<CstStr, CstStr> = HashMap::new();
        let key = CstStr::from("key");
        let val = CstStr::from("value");
        map.insert(key.clone(), val.clone());

        let key1 = CstStr::from("key");
        assert_eq!(map.get(&key1), Some(&val));
        assert_eq!(map.get(&key), Some(&val));
    }

    #[test]
    fn test_unquote() {
        assert_eq!(CstStr::from("'a'").unquote('\''), CstStr::from("a"));
        assert_eq!(CstStr::from("\"hi\"").unquote('"'), CstStr::from("hi"));
        assert_eq!(CstStr::from("plain").unquote('"'), CstStr::from("plain"));
    }
}
