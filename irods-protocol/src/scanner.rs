//! Error scanner: maps server status codes onto a typed taxonomy.

use crate::error_code::ErrorCode;
use std::fmt;

/// Kind of failure reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnixFileCreate,
    UnixFileMkdir,
    UnixFileRename,
    OverwriteWithoutForce,
    Authentication,
    InvalidUser,
    NoApiPrivilege,
    DataNotFound,
    DuplicateName,
    DuplicateData,
    ChecksumMismatch,
    FileNotFound,
    CollectionNotEmpty,
    RemoteScriptExecution,
    InvalidGroup,
    NoAccess,
    NoResourceDefined,
    NoMoreRules,
    CollectionNotMounted,
    FileDriver,
    CatalogSql,
    SpecificQuery,
    InvalidArgument,
    InvalidResource,
    ZoneUnavailable,
    InvalidInputParameter,
    InvalidClientUser,
    KeyException,
    ResourceHierarchy,
    InternalOperation,
    Negotiation,
    ResourceDoesNotExist,
    /// Any other negative status.
    Generic,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnixFileCreate => "unix file create error",
            ErrorKind::UnixFileMkdir => "unix file mkdir error",
            ErrorKind::UnixFileRename => "unix file rename error",
            ErrorKind::OverwriteWithoutForce => "overwrite without force flag",
            ErrorKind::Authentication => "authentication failed",
            ErrorKind::InvalidUser => "invalid user",
            ErrorKind::NoApiPrivilege => "no API privilege",
            ErrorKind::DataNotFound => "data not found",
            ErrorKind::DuplicateName => "duplicate name",
            ErrorKind::DuplicateData => "duplicate data",
            ErrorKind::ChecksumMismatch => "checksum mismatch",
            ErrorKind::FileNotFound => "file not found",
            ErrorKind::CollectionNotEmpty => "collection not empty",
            ErrorKind::RemoteScriptExecution => "remote script execution error",
            ErrorKind::InvalidGroup => "invalid group",
            ErrorKind::NoAccess => "no access",
            ErrorKind::NoResourceDefined => "no resource defined",
            ErrorKind::NoMoreRules => "no more rules",
            ErrorKind::CollectionNotMounted => "collection not mounted",
            ErrorKind::FileDriver => "file driver error",
            ErrorKind::CatalogSql => "catalog SQL error",
            ErrorKind::SpecificQuery => "specific query error",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::InvalidResource => "invalid resource",
            ErrorKind::ZoneUnavailable => "zone unavailable",
            ErrorKind::InvalidInputParameter => "invalid input parameter",
            ErrorKind::InvalidClientUser => "invalid client user",
            ErrorKind::KeyException => "key error",
            ErrorKind::ResourceHierarchy => "resource hierarchy error",
            ErrorKind::InternalOperation => "internal operation error",
            ErrorKind::Negotiation => "negotiation error",
            ErrorKind::ResourceDoesNotExist => "resource does not exist",
            ErrorKind::Generic => "iRODS error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a status code. Zero and positive values are not errors.
pub fn classify(code: i32) -> Option<ErrorKind> {
    if code >= 0 {
        return None;
    }
    Some(match code {
        -511_199..=-511_000 => ErrorKind::UnixFileCreate,
        -520_013..=-520_000 => ErrorKind::UnixFileMkdir,
        -528_036..=-528_000 => ErrorKind::UnixFileRename,
        -312_000 => ErrorKind::OverwriteWithoutForce,
        -826_000 | -993_000 => ErrorKind::Authentication,
        -827_000 => ErrorKind::InvalidUser,
        -13_000 => ErrorKind::NoApiPrivilege,
        -808_000 | -56_000 => ErrorKind::DataNotFound,
        -833_000 | -834_000 => ErrorKind::DuplicateName,
        -809_000 => ErrorKind::DuplicateData,
        -314_000 => ErrorKind::ChecksumMismatch,
        -817_000 | -814_000 | -310_000 => ErrorKind::FileNotFound,
        -821_000 | -79_000 => ErrorKind::CollectionNotEmpty,
        -344_000 => ErrorKind::RemoteScriptExecution,
        -829_000 => ErrorKind::InvalidGroup,
        -818_000 => ErrorKind::NoAccess,
        -321_000 => ErrorKind::NoResourceDefined,
        -1_018_000 => ErrorKind::NoMoreRules,
        -74_000 | -73_000 => ErrorKind::CollectionNotMounted,
        -522_000 => ErrorKind::FileDriver,
        -806_000 => ErrorKind::CatalogSql,
        -853_000 => ErrorKind::SpecificQuery,
        -816_000 => ErrorKind::InvalidArgument,
        -831_000 => ErrorKind::InvalidResource,
        -92_111 => ErrorKind::ZoneUnavailable,
        -130_000 => ErrorKind::InvalidInputParameter,
        -832_000 => ErrorKind::InvalidClientUser,
        -1_800_000 | -1_801_000 => ErrorKind::KeyException,
        -1_808_000 | -1_811_000 | -1_817_000 | -1_818_000 | -1_819_000 | -1_820_000
        | -1_822_000 | -1_823_000 => ErrorKind::InternalOperation,
        -1_815_000 | -1_824_000 | -1_825_000 => ErrorKind::Negotiation,
        -1_816_000..=-1_802_000 if code % 1000 == 0 => ErrorKind::ResourceHierarchy,
        -18_210_000 => ErrorKind::ResourceHierarchy,
        -78_000 => ErrorKind::ResourceDoesNotExist,
        _ => ErrorKind::Generic,
    })
}

/// Human readable description of a status code.
///
/// Named codes render as `NAME(code)`; others as an unknown-code notice.
pub fn describe(code: i32) -> String {
    match ErrorCode::from_code(code) {
        Some(named) => named.to_string(),
        None => format!("unknown iRODS exception code ({})", code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_positive_are_not_errors() {
        assert_eq!(classify(0), None);
        assert_eq!(classify(700), None);
    }

    #[test]
    fn test_ranges() {
        assert_eq!(classify(-511_000), Some(ErrorKind::UnixFileCreate));
        assert_eq!(classify(-511_002), Some(ErrorKind::UnixFileCreate));
        assert_eq!(classify(-511_199), Some(ErrorKind::UnixFileCreate));
        assert_eq!(classify(-520_013), Some(ErrorKind::UnixFileMkdir));
        assert_eq!(classify(-528_017), Some(ErrorKind::UnixFileRename));
        assert_eq!(classify(-528_037), Some(ErrorKind::Generic));
    }

    #[test]
    fn test_table_codes() {
        let table: &[(&[i32], ErrorKind)] = &[
            (&[-312_000], ErrorKind::OverwriteWithoutForce),
            (&[-826_000, -993_000], ErrorKind::Authentication),
            (&[-827_000], ErrorKind::InvalidUser),
            (&[-13_000], ErrorKind::NoApiPrivilege),
            (&[-808_000, -56_000], ErrorKind::DataNotFound),
            (&[-833_000, -834_000], ErrorKind::DuplicateName),
            (&[-809_000], ErrorKind::DuplicateData),
            (&[-314_000], ErrorKind::ChecksumMismatch),
            (&[-817_000, -814_000, -310_000], ErrorKind::FileNotFound),
            (&[-821_000, -79_000], ErrorKind::CollectionNotEmpty),
            (&[-344_000], ErrorKind::RemoteScriptExecution),
            (&[-829_000], ErrorKind::InvalidGroup),
            (&[-818_000], ErrorKind::NoAccess),
            (&[-321_000], ErrorKind::NoResourceDefined),
            (&[-1_018_000], ErrorKind::NoMoreRules),
            (&[-74_000, -73_000], ErrorKind::CollectionNotMounted),
            (&[-522_000], ErrorKind::FileDriver),
            (&[-806_000], ErrorKind::CatalogSql),
            (&[-853_000], ErrorKind::SpecificQuery),
            (&[-816_000], ErrorKind::InvalidArgument),
            (&[-831_000], ErrorKind::InvalidResource),
            (&[-92_111], ErrorKind::ZoneUnavailable),
            (&[-130_000], ErrorKind::InvalidInputParameter),
            (&[-832_000], ErrorKind::InvalidClientUser),
            (&[-1_800_000, -1_801_000], ErrorKind::KeyException),
            (
                &[
                    -1_802_000, -1_803_000, -1_804_000, -1_805_000, -1_806_000, -1_807_000,
                    -1_809_000, -1_810_000, -1_812_000, -1_813_000, -1_814_000, -1_816_000,
                    -18_210_000,
                ],
                ErrorKind::ResourceHierarchy,
            ),
            (
                &[
                    -1_808_000, -1_811_000, -1_817_000, -1_818_000, -1_819_000, -1_820_000,
                    -1_822_000, -1_823_000,
                ],
                ErrorKind::InternalOperation,
            ),
            (&[-1_815_000, -1_824_000, -1_825_000], ErrorKind::Negotiation),
            (&[-78_000], ErrorKind::ResourceDoesNotExist),
        ];
        for (codes, kind) in table {
            for code in codes.iter() {
                assert_eq!(classify(*code), Some(*kind), "code {}", code);
            }
        }
    }

    #[test]
    fn test_unknown_code_is_generic() {
        assert_eq!(classify(-999_999_999), Some(ErrorKind::Generic));
        assert_eq!(classify(-1_802_001), Some(ErrorKind::Generic));
        assert_eq!(
            describe(-999_999_999),
            "unknown iRODS exception code (-999999999)"
        );
    }

    #[test]
    fn test_describe_named() {
        assert_eq!(describe(-808_000), "CAT_NO_ROWS_FOUND(-808000)");
    }
}
