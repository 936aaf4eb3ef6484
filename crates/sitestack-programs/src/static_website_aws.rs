//! Static website on AWS
//!
//! S3 website bucket synced from `path`, served through CloudFront on
//! `<subdomain>.<domain>` with a DNS-validated ACM certificate.

use sitestack_aws::acm::{Certificate, CertificateArgs};
use sitestack_aws::cloudfront::{
    CacheBehaviorArgs, CustomErrorResponseArgs, CustomOriginConfigArgs, Distribution,
    DistributionArgs, ForwardedValuesArgs, OriginArgs, RestrictionsArgs, ViewerCertificateArgs,
};
use sitestack_aws::route53::{
    GetZoneArgs, Record, RecordAliasArgs, RecordArgs, RecordType, get_zone,
};
use sitestack_aws::s3::{Bucket, BucketArgs, BucketWebsiteArgs};
use sitestack_aws::{Provider, ProviderArgs};
use sitestack_config::{DomainSettings, SiteSettings, StackConfig};
use sitestack_engine::{
    Input, ResourceOptions, Result, S3BucketFolder, S3BucketFolderArgs, Session, literal,
};

const CACHE_TTL: i64 = 600;

pub fn run(ctx: &Session, config: &StackConfig) -> Result<()> {
    let site = SiteSettings::load(config);
    let domain = DomainSettings::load(config)?;
    let domain_name = domain.domain_name();

    let bucket = Bucket::new(
        ctx,
        "bucket",
        BucketArgs {
            acl: "public-read".into(),
            website: Some(BucketWebsiteArgs {
                index_document: site.index_document.as_str().into(),
                error_document: site.error_document.as_str().into(),
            }),
            ..Default::default()
        },
        ResourceOptions::new(),
    )?;

    S3BucketFolder::new(
        ctx,
        "bucket-folder",
        S3BucketFolderArgs {
            path: site.path.as_str().into(),
            bucket_name: bucket.bucket().into(),
            acl: "public-read".into(),
        },
        ResourceOptions::new(),
    )?;

    let zone_id = get_zone(
        ctx,
        GetZoneArgs {
            name: domain.domain.as_str().into(),
            ..Default::default()
        },
    )
    .apply(|zone| zone.zone_id);

    // CloudFront only accepts certificates from us-east-1
    let us_east = Provider::new(
        ctx,
        "us-east-provider",
        ProviderArgs {
            region: "us-east-1".into(),
        },
        ResourceOptions::new(),
    )?;

    let certificate = Certificate::new(
        ctx,
        "certificate",
        CertificateArgs {
            domain_name: domain_name.as_str().into(),
            validation_method: "DNS".into(),
            ..Default::default()
        },
        ResourceOptions::new().provider(us_east.resource()),
    )?;

    let validation = certificate.first_validation_option();
    Record::new(
        ctx,
        "certificate-validation",
        RecordArgs {
            name: validation.apply(|o| o.resource_record_name).into(),
            record_type: validation.apply(|o| o.resource_record_type).into(),
            records: Input::array([validation.apply(|o| o.resource_record_value)]),
            zone_id: (&zone_id).into(),
            ttl: 60.into(),
            ..Default::default()
        },
        ResourceOptions::new(),
    )?;

    let methods = || Input::from(vec!["GET", "HEAD", "OPTIONS"]);
    let cdn = Distribution::new(
        ctx,
        "cdn",
        DistributionArgs {
            enabled: true.into(),
            origins: vec![OriginArgs {
                origin_id: bucket.arn().into(),
                domain_name: bucket.website_endpoint().into(),
                custom_origin_config: Some(CustomOriginConfigArgs {
                    origin_protocol_policy: "http-only".into(),
                    http_port: 80.into(),
                    https_port: 443.into(),
                    origin_ssl_protocols: vec!["TLSv1.2"].into(),
                }),
            }],
            default_cache_behavior: CacheBehaviorArgs {
                target_origin_id: bucket.arn().into(),
                viewer_protocol_policy: "redirect-to-https".into(),
                allowed_methods: methods(),
                cached_methods: methods(),
                default_ttl: CACHE_TTL.into(),
                max_ttl: CACHE_TTL.into(),
                min_ttl: CACHE_TTL.into(),
                forwarded_values: Some(ForwardedValuesArgs {
                    query_string: true.into(),
                    cookies_forward: "all".into(),
                }),
            },
            price_class: "PriceClass_100".into(),
            custom_error_responses: vec![CustomErrorResponseArgs {
                error_code: 404.into(),
                response_code: 404.into(),
                response_page_path: format!("/{}", site.error_document).into(),
            }],
            restrictions: RestrictionsArgs {
                restriction_type: "none".into(),
            },
            aliases: vec![domain_name.clone()].into(),
            viewer_certificate: ViewerCertificateArgs {
                cloudfront_default_certificate: false.into(),
                acm_certificate_arn: certificate.arn().into(),
                ssl_support_method: "sni-only".into(),
            },
        },
        ResourceOptions::new(),
    )?;

    // The alias waits for the certificate so the domain never serves an
    // unvalidated name
    Record::new(
        ctx,
        &domain_name,
        RecordArgs {
            name: domain.subdomain.as_str().into(),
            zone_id: zone_id.into(),
            record_type: RecordType::A.into(),
            aliases: vec![RecordAliasArgs {
                name: cdn.domain_name().into(),
                zone_id: cdn.hosted_zone_id().into(),
                evaluate_target_health: true.into(),
            }],
            ..Default::default()
        },
        ResourceOptions::new().depends_on(certificate.resource()),
    )?;

    ctx.export("originURL", bucket.website_endpoint().wrap("http://", ""));
    ctx.export("originHostname", bucket.website_endpoint());
    ctx.export("cdnURL", cdn.domain_name().wrap("https://", ""));
    ctx.export("cdnHostname", cdn.domain_name());
    ctx.export("domainURL", literal(format!("https://{}", domain_name)));
    Ok(())
}
