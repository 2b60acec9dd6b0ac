use crate::error::{LabelParseError, LabelParseReason};

/// Parse the class label from an image path.
///
/// The label is the numeric prefix of the parent directory name, for
/// example `.../043.coin/043_0042.jpg` gives 43.
pub fn file_to_label(path: &str) -> Result<i32, LabelParseError> {
    let error = |reason| LabelParseError {
        path: path.to_owned(),
        reason,
    };

    let segments: Vec<_> = path.split('/').collect();
    let dir_name = match *segments.as_slice() {
        [.., dir_name, _file_name] => dir_name,
        _ => return Err(error(LabelParseReason::TooFewPathSegments)),
    };

    let parts: Vec<_> = dir_name.split('.').collect();
    let digits = match *parts.as_slice() {
        [.., digits, _name] => digits,
        _ => {
            return Err(error(LabelParseReason::TooFewDotSegments(
                dir_name.to_owned(),
            )))
        }
    };

    // reject signs and whitespace that str::parse() would accept
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(error(LabelParseReason::InvalidInteger(digits.to_owned())));
    }

    digits
        .parse()
        .map_err(|_| error(LabelParseReason::InvalidInteger(digits.to_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_to_label_test() {
        assert_eq!(
            file_to_label("/mnt/poc/images/caltech_256/043.coin/043_0042.jpg"),
            Ok(43)
        );
        assert_eq!(
            file_to_label("dbfs:/mnt/caltech_256/255.tennis-shoes/255_0001.jpg"),
            Ok(255)
        );
        assert_eq!(file_to_label("001.ak47/001_0001.jpg"), Ok(1));
        assert_eq!(file_to_label("/data/257.clutter/257_0001.jpg"), Ok(257));
    }

    #[test]
    fn uses_second_to_last_dot_part_test() {
        // "a.12.b" -> "12"
        assert_eq!(file_to_label("/root/a.12.b/x.jpg"), Ok(12));

        let err = file_to_label("/root/001.ak.47/001_0001.jpg").unwrap_err();
        assert_eq!(err.reason, LabelParseReason::InvalidInteger("ak".into()));
    }

    #[test]
    fn malformed_path_test() {
        let err = file_to_label("coin/043_0042.jpg").unwrap_err();
        assert_eq!(
            err.reason,
            LabelParseReason::TooFewDotSegments("coin".into())
        );
        assert_eq!(err.path, "coin/043_0042.jpg");

        let err = file_to_label("043_0042.jpg").unwrap_err();
        assert_eq!(err.reason, LabelParseReason::TooFewPathSegments);

        let err = file_to_label("/root/abc.coin/1.jpg").unwrap_err();
        assert_eq!(err.reason, LabelParseReason::InvalidInteger("abc".into()));

        let err = file_to_label("/root/-3.coin/1.jpg").unwrap_err();
        assert_eq!(err.reason, LabelParseReason::InvalidInteger("-3".into()));

        let err = file_to_label("/root/.coin/1.jpg").unwrap_err();
        assert_eq!(err.reason, LabelParseReason::InvalidInteger("".into()));

        let err = file_to_label("/root/99999999999.big/1.jpg").unwrap_err();
        assert_eq!(
            err.reason,
            LabelParseReason::InvalidInteger("99999999999".into())
        );
    }
}
