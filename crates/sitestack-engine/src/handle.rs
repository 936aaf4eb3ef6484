//! Typed resource handles
//!
//! Cloud crates wrap [`crate::Resource`] in one struct per resource type so
//! that programs read attributes by method instead of by string.

/// Declares a typed handle for one resource type.
///
/// ```ignore
/// resource_handle!(
///     /// An S3 bucket
///     Bucket, "aws:s3/bucket:Bucket", BucketArgs
/// );
/// ```
///
/// The generated `new` registers the resource with the session; `Args`
/// must convert into [`crate::Args`].
#[macro_export]
macro_rules! resource_handle {
    ($(#[$meta:meta])* $name:ident, $token:literal, $args:ty) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name {
            resource: $crate::Resource,
        }

        impl $name {
            pub const TOKEN: &'static str = $token;

            pub fn new(
                ctx: &$crate::Session,
                name: &str,
                args: $args,
                options: $crate::ResourceOptions,
            ) -> $crate::Result<Self> {
                let resource = ctx.register(Self::TOKEN, name, args.into(), options)?;
                Ok(Self { resource })
            }

            pub fn resource(&self) -> &$crate::Resource {
                &self.resource
            }

            pub fn urn(&self) -> &$crate::Urn {
                self.resource.urn()
            }

            pub fn id(&self) -> $crate::Output<String> {
                self.resource.id()
            }
        }

        impl AsRef<$crate::Resource> for $name {
            fn as_ref(&self) -> &$crate::Resource {
                &self.resource
            }
        }
    };
}
