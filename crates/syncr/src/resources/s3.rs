use super::{ArnResolver, SelfContext, SELF};
use crate::errors::SpecResult;
use crate::meta::Meta;
use crate::spec::{string, Spec};
use crate::value::Value;

/// `s3: <bucket>` references
///
/// A bare bucket yields the bucket and everything in it, a path (`bucket/key`) only itself.
#[derive(Debug, derive_new::new)]
pub struct S3Resolver<'r> {
    self_context: &'r SelfContext,
}

impl ArnResolver for S3Resolver<'_> {
    fn resolve(&self, meta: &Meta, val: &Value) -> SpecResult<Vec<String>> {
        let mut bucket_key = string().normalise(meta, Some(val))?;
        if bucket_key == SELF {
            bucket_key = self.self_context.expect(meta, "bucket")?.to_string();
        }

        let mut arns = vec![format!("arn:aws:s3:::{bucket_key}")];
        if !bucket_key.contains('/') {
            arns.push(format!("arn:aws:s3:::{bucket_key}/*"));
        }

        Ok(arns)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::errors::SpecError;
    use crate::resources::test::tree;
    use pretty_assertions::assert_eq;

    fn resolve(self_context: SelfContext, bucket: &str) -> SpecResult<Vec<String>> {
        let tree = tree();
        let meta = Meta::new(&tree).at("s3");
        S3Resolver::new(&self_context).resolve(&meta, &bucket.into())
    }

    #[test]
    fn bucket_and_contents() {
        let found = resolve(SelfContext::new("lambda", "fn"), "my-bucket").unwrap();
        assert_eq!(found, ["arn:aws:s3:::my-bucket", "arn:aws:s3:::my-bucket/*"]);
    }

    #[test]
    fn paths_have_no_wildcard() {
        let found = resolve(SelfContext::new("lambda", "fn"), "my-bucket/path").unwrap();
        assert_eq!(found, ["arn:aws:s3:::my-bucket/path"]);
    }

    #[test]
    fn self_reference() {
        let found = resolve(SelfContext::new("bucket", "the-bucket"), "__self__").unwrap();
        assert_eq!(
            found,
            ["arn:aws:s3:::the-bucket", "arn:aws:s3:::the-bucket/*"]
        );
    }

    #[test]
    fn self_reference_needs_a_bucket() {
        let err = resolve(SelfContext::new("key", "k"), "__self__").unwrap_err();
        assert!(matches!(
            err,
            SpecError::InvalidSelfReference { expected: "bucket", .. }
        ));
    }

    #[test]
    fn bucket_must_be_a_string() {
        let tree = tree();
        let meta = Meta::new(&tree).at("s3");
        let context = SelfContext::new("lambda", "fn");
        let err = S3Resolver::new(&context)
            .resolve(&meta, &Value::Integer(3))
            .unwrap_err();
        assert!(matches!(err, SpecError::InvalidValue { .. }));
    }
}
