//! Resource type name normalization
//!
//! Three spellings are accepted for every kind: the Terraform-style
//! `aws_<service>_<resource>`, the CloudFormation / Cloud Control style
//! `AWS::<Service>::<Resource>`, and the short `<service>_<resource>`.

pub const DYNAMODB_TABLE: &str = "aws_dynamodb_table";
pub const S3_BUCKET: &str = "aws_s3_bucket";

/// Known spellings and the canonical key each maps to. Lookups are exact.
const ALIASES: &[(&str, &str)] = &[
    ("aws_dynamodb_table", DYNAMODB_TABLE),
    ("AWS::DynamoDB::Table", DYNAMODB_TABLE),
    ("AWS::DynamoDB::GlobalTable", DYNAMODB_TABLE),
    ("dynamodb_table", DYNAMODB_TABLE),
    ("aws_s3_bucket", S3_BUCKET),
    ("AWS::S3::Bucket", S3_BUCKET),
    ("s3_bucket", S3_BUCKET),
];

const SEPARATOR: &str = "::";

/// Map a resource type name to its canonical snake_case key.
///
/// Unknown `Namespace::Service::Resource` names are converted by
/// lower-casing and joining the segments with `_`; anything else that is not
/// a known alias is returned unchanged.
pub fn normalize_type_name(input: &str) -> String {
    if let Some((_, canonical)) = ALIASES.iter().find(|(alias, _)| *alias == input) {
        return canonical.to_string();
    }

    let segments: Vec<&str> = input.split(SEPARATOR).collect();
    if segments.len() == 3 && segments.iter().all(|s| !s.is_empty()) {
        return segments
            .iter()
            .map(|s| s.to_lowercase())
            .collect::<Vec<_>>()
            .join("_");
    }

    input.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        let cases = [
            ("aws_dynamodb_table", "aws_dynamodb_table"),
            ("AWS::DynamoDB::Table", "aws_dynamodb_table"),
            ("dynamodb_table", "aws_dynamodb_table"),
            ("AWS::DynamoDB::GlobalTable", "aws_dynamodb_table"),
            ("aws_s3_bucket", "aws_s3_bucket"),
            ("AWS::S3::Bucket", "aws_s3_bucket"),
            ("s3_bucket", "aws_s3_bucket"),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_type_name(input), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_unknown_three_part_names_are_converted() {
        assert_eq!(normalize_type_name("AWS::Lambda::Function"), "aws_lambda_function");
        assert_eq!(normalize_type_name("AWS::IAM::Role"), "aws_iam_role");
    }

    #[test]
    fn test_passthrough() {
        for input in [
            "aws_unknown_resource",
            "AWS::Service",
            "AWS::Service::Resource::Extra",
            "some_random_type",
            "",
        ] {
            assert_eq!(normalize_type_name(input), input);
        }
    }

    #[test]
    fn test_empty_segments_are_malformed() {
        for input in ["::S3::Bucket", "AWS::::Bucket", "AWS::S3::", "::::"] {
            assert_eq!(normalize_type_name(input), input);
        }
    }

    #[test]
    fn test_alias_lookup_is_case_sensitive() {
        assert_eq!(normalize_type_name("aws::s3::bucket"), "aws_s3_bucket");
        assert_eq!(normalize_type_name("S3_BUCKET"), "S3_BUCKET");
        assert_eq!(normalize_type_name("AWS_S3_BUCKET"), "AWS_S3_BUCKET");
    }
}
