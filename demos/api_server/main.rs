//! Monetization API backed by in-memory stores
//!
//! Run with:
//!
//! ```sh
//! cargo run --example api_server
//! curl 'http://127.0.0.1:3000/packages?sortOrder=DESC&sortField=price&page=0&perPage=2'
//! curl 'http://127.0.0.1:3000/packages?price%3E=1&price%3C=100'
//! curl -X PUT http://127.0.0.1:3000/organizations/org-1 \
//!      -H 'content-type: application/json' -d '{"name": "Initech Global"}'
//! ```
//!
//! Set `API_CONFIG` to a YAML file to override the default resources.

use monetize::prelude::*;
use tower_http::cors::CorsLayer;

fn seed(config: &ApiConfig) -> Result<Vec<(String, InMemoryResourceService)>> {
    let fixtures: [(&str, Vec<Value>); 4] = [
        (
            "organizations",
            vec![
                json!({"id": "org-1", "name": "Initech", "seats": 10, "isActive": true}),
                json!({"id": "org-2", "name": "Hooli", "seats": 250, "isActive": true}),
                json!({"id": "org-3", "name": "Pied Piper", "seats": 0, "isActive": false}),
            ],
        ),
        (
            "memberships",
            vec![
                json!({"id": "m-1", "organizationId": "org-1", "email": "peter@initech.com", "role": "owner"}),
                json!({"id": "m-2", "organizationId": "org-2", "email": "gavin@hooli.com", "role": "owner"}),
                json!({"id": "m-3", "organizationId": "org-2", "email": "dinesh@hooli.com", "role": "member"}),
            ],
        ),
        (
            "packages",
            vec![
                json!({"id": "free", "name": "Free", "price": 0}),
                json!({"id": "starter", "name": "Starter", "price": 9}),
                json!({"id": "team", "name": "Team", "price": 49}),
                json!({"id": "enterprise", "name": "Enterprise", "price": 499}),
            ],
        ),
        (
            "licenses",
            vec![
                json!({"id": "lic-1", "packageId": "team", "organizationId": "org-2", "seats": 25}),
                json!({"id": "lic-2", "packageId": "starter", "organizationId": "org-1", "seats": 3}),
            ],
        ),
    ];

    let mut services = Vec::new();
    for (resource, records) in fixtures {
        if config.find_resource(resource).is_none() {
            continue;
        }
        let service = InMemoryResourceService::with_settings(resource, config.query.clone());
        for record in records {
            service.add(record)?;
        }
        tracing::info!(resource, "seeded in-memory store");
        services.push((resource.to_string(), service));
    }
    Ok(services)
}

#[tokio::main]
async fn main() -> Result<()> {
    monetize::logging::init("monetize=debug,tower_http=debug,info");

    let config = match std::env::var("API_CONFIG") {
        Ok(path) => ApiConfig::from_yaml_file(&path)?,
        Err(_) => ApiConfig::default_config(),
    };

    let mut builder = ServerBuilder::new().with_config(config.clone());
    for (resource, service) in seed(&config)? {
        builder = builder.register_resource(&resource, service);
    }

    builder
        .with_in_memory_resources()
        .with_cors(CorsLayer::permissive())
        .serve("127.0.0.1:3000")
        .await
}
