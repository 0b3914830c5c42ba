use super::*;
use std::num::NonZeroU16;

#[derive(Debug)]
struct Directory;

#[derive(Debug)]
struct Prober;

#[async_trait::async_trait]
impl DestinationDirectory for Directory {
    async fn hosts_for_tenant(&self, tenant: &str) -> Result<Vec<String>> {
        match tenant {
            "photos" => Ok(vec!["store-1".to_string(), "store-2".to_string()]),
            _ => anyhow::bail!("unknown collection '{tenant}'"),
        }
    }
}

#[async_trait::async_trait]
impl AvailabilityProber for Prober {
    async fn available_hosts(&self, hosts: &[String], _: NonZeroU16) -> Result<Vec<String>> {
        Ok(hosts.to_vec())
    }
}

fn args() -> RouterArgs {
    RouterArgs {
        service_domain: "nimbus.io".to_string(),
        read_port: NonZeroU16::new(8081).unwrap(),
        write_port: NonZeroU16::new(8082).unwrap(),
        always_first_host: false,
        hash_key_path: None,
        management_destinations: "mgmt-a:8088 mgmt-b:8088".to_string(),
        trusted_proxies: None,
    }
}

fn front_door() -> FrontDoor<Directory, Prober> {
    FrontDoor::new(args(), Directory, Prober).expect("front door must build")
}

fn peer() -> IpAddr {
    "192.0.2.10".parse().unwrap()
}

#[test]
fn invalid_configuration() {
    let err = FrontDoor::new(
        RouterArgs {
            management_destinations: " ".to_string(),
            ..args()
        },
        Directory,
        Prober,
    )
    .expect_err("must fail");
    assert!(err.to_string().contains("management"), "{err}");

    assert!(FrontDoor::new(
        RouterArgs {
            hash_key_path: Some("/nonexistent/front-door/key".into()),
            ..args()
        },
        Directory,
        Prober,
    )
    .is_err());
}

#[tokio::test]
async fn routes() {
    let fd = front_door();

    let req = http::Request::get("/").header(header::HOST, "nimbus.io").body(()).unwrap();
    assert_eq!(fd.route(&req).await.unwrap(), "mgmt-a:8088");

    let req = http::Request::put("http://photos.nimbus.io/data/cat.jpg")
        .body(())
        .unwrap();
    let dest = fd.route(&req).await.unwrap();
    assert!(
        dest == "store-1:8082" || dest == "store-2:8082",
        "unexpected destination {dest}"
    );

    let req = http::Request::get("http://videos.nimbus.io/data/dog.mp4")
        .body(())
        .unwrap();
    let err = fd.route(&req).await.unwrap_err();
    assert_eq!(err.status(), http::StatusCode::NOT_FOUND);
}

#[test]
fn authorizes_against_tenant_policy() {
    let fd = front_door();

    let get = |path: &str| http::Request::get(path).body(()).unwrap();

    // Without a policy, credentials are required.
    assert_eq!(
        fd.authorize("photos", &get("/data/cat.jpg"), peer()),
        Ok(Some(Verdict::RequiresPasswordAuthentication))
    );

    fd.policies()
        .write()
        .apply(
            "photos",
            Some(
                &br#"{
                    "version": "1.0",
                    "allow_unauth_read": true,
                    "allow_unauth_list": true,
                    "locations": [
                        { "prefix": "/data/private", "ipv4_whitelist": ["10.0.0.0/8"] }
                    ]
                }"#[..],
            ),
        )
        .expect("document must load");

    assert_eq!(
        fd.authorize("photos", &get("/data/cat.jpg"), peer()),
        Ok(Some(Verdict::Allowed))
    );
    assert_eq!(
        fd.authorize("photos", &get("/data/"), peer()),
        Ok(Some(Verdict::Allowed))
    );
    assert_eq!(
        fd.authorize(
            "photos",
            &http::Request::delete("/data/cat.jpg").body(()).unwrap(),
            peer()
        ),
        Ok(Some(Verdict::RequiresPasswordAuthentication))
    );
    assert_eq!(
        fd.authorize("photos", &get("/data/private/x"), peer()),
        Ok(Some(Verdict::Forbidden))
    );

    assert_eq!(fd.authorize("photos", &get("/ping"), peer()), Ok(None));
}

#[test]
fn forwarded_client_from_trusted_proxy() {
    let fd = FrontDoor::new(
        RouterArgs {
            trusted_proxies: Some("192.0.2.0/24".parse().unwrap()),
            ..args()
        },
        Directory,
        Prober,
    )
    .expect("front door must build");
    fd.policies()
        .write()
        .apply(
            "photos",
            Some(
                &br#"{
                    "version": "1.0",
                    "allow_unauth_read": true,
                    "ipv4_whitelist": ["10.0.0.0/8"]
                }"#[..],
            ),
        )
        .unwrap();

    let forwarded = |client: &str| {
        http::Request::get("/data/cat.jpg")
            .header(X_FORWARDED_FOR, client)
            .body(())
            .unwrap()
    };

    // Behind a trusted proxy the forwarded client is checked against whitelists.
    assert_eq!(
        fd.authorize("photos", &forwarded("10.1.2.3:5555, 192.0.2.10"), peer()),
        Ok(Some(Verdict::Allowed))
    );
    assert_eq!(
        fd.authorize("photos", &forwarded("203.0.113.7"), peer()),
        Ok(Some(Verdict::Forbidden))
    );
    let bare = http::Request::get("/data/cat.jpg").body(()).unwrap();
    assert_eq!(
        fd.authorize("photos", &bare, peer()),
        Ok(Some(Verdict::Forbidden))
    );

    // Other peers are judged by their own address.
    let direct = "203.0.113.66".parse().unwrap();
    assert_eq!(
        fd.authorize("photos", &forwarded("10.9.9.9"), direct),
        Ok(Some(Verdict::Forbidden))
    );
}

#[test]
fn forwarded_for_is_ignored_without_trusted_proxies() {
    let fd = front_door();
    fd.policies()
        .write()
        .apply(
            "photos",
            Some(
                &br#"{
                    "version": "1.0",
                    "allow_unauth_read": true,
                    "ipv4_whitelist": ["10.0.0.0/8"]
                }"#[..],
            ),
        )
        .unwrap();

    let spoofed = http::Request::get("/data/cat.jpg")
        .header(X_FORWARDED_FOR, "10.9.9.9")
        .body(())
        .unwrap();
    assert_eq!(
        fd.authorize("photos", &spoofed, "203.0.113.66".parse().unwrap()),
        Ok(Some(Verdict::Forbidden))
    );
    assert_eq!(
        fd.authorize("photos", &spoofed, "10.0.0.1".parse().unwrap()),
        Ok(Some(Verdict::Allowed))
    );
}

#[test]
fn referer_restricts_unauthenticated_access() {
    let fd = front_door();
    fd.policies()
        .write()
        .apply(
            "photos",
            Some(
                &br#"{
                    "version": "1.0",
                    "allow_unauth_read": true,
                    "unauth_referrer_whitelist": ["example.com/gallery"]
                }"#[..],
            ),
        )
        .unwrap();

    let with_referer = |referer: &str| {
        http::Request::get("/data/cat.jpg")
            .header(header::REFERER, referer)
            .body(())
            .unwrap()
    };
    assert_eq!(
        fd.authorize("photos", &with_referer("https://Example.com/gallery/2"), peer()),
        Ok(Some(Verdict::Allowed))
    );
    assert_eq!(
        fd.authorize("photos", &with_referer("https://example.org/gallery"), peer()),
        Ok(Some(Verdict::RequiresPasswordAuthentication))
    );
}

#[test]
fn version_mismatch_is_an_error() {
    let fd = front_door();
    fd.policies()
        .write()
        .apply("photos", Some(&br#"{"version": "0.9", "allow_unauth_read": true}"#[..]))
        .unwrap();
    let req = http::Request::get("/data/cat.jpg").body(()).unwrap();
    assert!(fd.authorize("photos", &req, peer()).is_err());
}

#[test]
fn exposes_metrics() {
    let fd = front_door();
    fd.policies().write().apply("photos", None).unwrap();
    fd.policies()
        .write()
        .apply("videos", Some(&b"{\"bogus\": 1}"[..]))
        .unwrap_err();

    let mut text = String::new();
    prometheus_client::encoding::text::encode(&mut text, fd.metrics()).unwrap();
    assert!(text.contains("policy_index_tenant_index_size 1"), "{text}");
    assert!(text.contains("policy_index_load_failures_total 1"), "{text}");
    assert!(text.contains("route_routed"), "{text}");
}
