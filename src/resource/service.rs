//! Resource Service
//!
//! CRUD and paginated listing for one resource type. Payloads are checked
//! locally before anything is sent; list pages are aggregated before any
//! client-side filter runs.

use super::filter::ListOptions;
use super::registry::{get_resource, ResourceDescriptor};
use super::{KindRules, RegisteredKind, ResourceKind};
use crate::error::ScmError;
use crate::models::common::{Container, ScopedObject};
use crate::models::{rules_for, RawResource};
use crate::scm::client::ScmClient;
use crate::validation::{SchemaRules, ValidationError};
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use uuid::Uuid;

/// Operations on one resource type. Holds no mutable state of its own.
pub struct ResourceService<R: ResourceKind> {
    client: ScmClient,
    descriptor: ResourceDescriptor,
    rules: KindRules,
    _kind: PhantomData<fn() -> R>,
}

impl<R: ResourceKind> Clone for ResourceService<R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            descriptor: self.descriptor.clone(),
            rules: self.rules,
            _kind: PhantomData,
        }
    }
}

impl<R: ResourceKind> ResourceService<R> {
    pub fn new(client: ScmClient, descriptor: ResourceDescriptor) -> Self {
        Self {
            client,
            descriptor,
            rules: KindRules::of::<R>(),
            _kind: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// Create an object. Invalid payloads fail without a request.
    pub async fn create(&self, payload: &R::Create) -> Result<R::Response, ScmError> {
        let rules = &self.rules.create;
        let body = rules.apply(to_value(rules, payload)?)?;
        tracing::debug!("Creating {} at {}", self.descriptor.display_name, self.descriptor.path);

        let response = self.client.post(&self.descriptor.path, body).await?;
        self.decode(response)
    }

    /// Fetch one object by id
    pub async fn get(&self, id: &str) -> Result<R::Response, ScmError> {
        let id = parse_id(id)?;
        let response = self
            .client
            .get(&self.descriptor.item_path(&id), &[])
            .await?;
        self.decode(response)
    }

    /// Replace an object. The id travels in the path, not the body.
    pub async fn update(&self, payload: &R::Update) -> Result<R::Response, ScmError> {
        let rules = &self.rules.update;
        let mut body = rules.apply(to_value(rules, payload)?)?;

        let id = match body.as_object_mut().and_then(|map| map.remove("id")) {
            Some(Value::String(id)) => parse_id(&id)?,
            Some(other) => {
                return Err(ValidationError::InvalidIdentifier {
                    value: other.to_string(),
                }
                .into())
            }
            None => {
                return Err(ValidationError::MissingField {
                    path: "id".to_string(),
                }
                .into())
            }
        };

        let response = self
            .client
            .put(&self.descriptor.item_path(&id), body)
            .await?;
        self.decode(response)
    }

    /// Delete an object; a missing object is an error
    pub async fn delete(&self, id: &str) -> Result<(), ScmError> {
        let id = parse_id(id)?;
        self.client.delete(&self.descriptor.item_path(&id)).await?;
        Ok(())
    }

    /// Delete an object, treating "already gone" as success.
    /// Returns whether anything was deleted.
    pub async fn delete_if_present(&self, id: &str) -> Result<bool, ScmError> {
        match self.delete(id).await {
            Ok(()) => Ok(true),
            Err(ScmError::ObjectNotPresent(failure)) => {
                tracing::debug!("{} {} already absent: {}", self.descriptor.display_name, id, failure);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// List every object in a container, following pages until a short one.
    pub async fn list(
        &self,
        container: &Container,
        options: &ListOptions,
    ) -> Result<Vec<R::Response>, ScmError> {
        let limit = options.page_size(&self.descriptor)?;
        let mut base_query = vec![container.query_pair()];
        base_query.extend(options.server_params());

        let mut items = Vec::new();
        let mut offset: u64 = 0;
        let mut pages = 0usize;

        loop {
            let mut query = base_query.clone();
            query.push(("limit".to_string(), limit.to_string()));
            query.push(("offset".to_string(), offset.to_string()));

            let response = self.client.get(&self.descriptor.path, &query).await?;
            let page = self.collection(response)?;
            let count = page.len();
            pages += 1;

            for item in page {
                items.push(self.decode(item)?);
            }

            if count < limit as usize {
                break;
            }
            offset += u64::from(limit);
        }

        tracing::debug!(
            "Listed {} {} in {} across {} page(s)",
            items.len(),
            self.descriptor.display_name,
            container,
            pages
        );

        Ok(options.apply(container, items))
    }

    /// Find one object by exact name in exactly this container
    pub async fn fetch(
        &self,
        name: &str,
        container: &Container,
    ) -> Result<Option<R::Response>, ScmError> {
        let options = ListOptions::new().filter("name", name).exact_match();
        let matches: Vec<R::Response> = self
            .list(container, &options)
            .await?
            .into_iter()
            .filter(|item| item.name() == Some(name))
            .collect();

        if matches.len() > 1 {
            tracing::warn!(
                "{} matches for {} '{}' in {}, using the first",
                matches.len(),
                self.descriptor.display_name,
                name,
                container
            );
        }
        Ok(matches.into_iter().next())
    }

    fn collection(&self, response: Value) -> Result<Vec<Value>, ValidationError> {
        let key = &self.descriptor.collection_key;
        match response {
            Value::Object(mut map) => match map.remove(key) {
                Some(Value::Array(items)) => Ok(items),
                _ => Err(ValidationError::MissingCollection { key: key.clone() }),
            },
            _ => Err(ValidationError::MissingCollection { key: key.clone() }),
        }
    }

    fn decode(&self, item: Value) -> Result<R::Response, ScmError> {
        let item = self.rules.response.apply(item)?;
        serde_json::from_value(item).map_err(|e| {
            ScmError::InvalidObject(ValidationError::Decode {
                schema: self.rules.response.name.to_string(),
                message: e.to_string(),
            })
        })
    }
}

impl<R: RegisteredKind> ResourceService<R> {
    /// Service for the descriptor registered under `R::KEY`
    pub fn from_registry(client: ScmClient) -> Result<Self, ScmError> {
        Ok(Self::new(client, registered(R::KEY)?.clone()))
    }
}

impl ResourceService<RawResource> {
    /// Untyped service for any registered key. Keys with a typed schema are
    /// still validated with that schema's rules.
    pub fn for_key(client: ScmClient, key: &str) -> Result<Self, ScmError> {
        let mut service = Self::new(client, registered(key)?.clone());
        if let Some(rules) = rules_for(key) {
            service.rules = rules;
        }
        Ok(service)
    }
}

impl ScmClient {
    /// Service for a typed resource kind
    pub fn resource<R: RegisteredKind>(&self) -> Result<ResourceService<R>, ScmError> {
        ResourceService::from_registry(self.clone())
    }

    /// Untyped service for a registry key
    pub fn raw_resource(&self, key: &str) -> Result<ResourceService<RawResource>, ScmError> {
        ResourceService::for_key(self.clone(), key)
    }
}

fn registered(key: &str) -> Result<&'static ResourceDescriptor, ValidationError> {
    get_resource(key).ok_or_else(|| ValidationError::UnknownResource {
        key: key.to_string(),
    })
}

fn to_value<T: Serialize>(rules: &SchemaRules, payload: &T) -> Result<Value, ValidationError> {
    serde_json::to_value(payload).map_err(|e| ValidationError::Decode {
        schema: rules.name.to_string(),
        message: e.to_string(),
    })
}

fn parse_id(id: &str) -> Result<String, ValidationError> {
    Uuid::parse_str(id.trim())
        .map(|uuid| uuid.to_string())
        .map_err(|_| ValidationError::InvalidIdentifier {
            value: id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{AddressCreate, AddressFields, Addresses, ContainerFields};
    use crate::scm::http::{HttpRequest, HttpResponse, Method, Transport, TransportError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Records requests and answers from a fixed queue
    struct ScriptedTransport {
        requests: Mutex<Vec<HttpRequest>>,
        responses: Mutex<Vec<HttpResponse>>,
    }

    impl ScriptedTransport {
        fn new(mut responses: Vec<HttpResponse>) -> Arc<Self> {
            responses.reverse();
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| TransportError::Request("no scripted response".to_string()))
        }
    }

    fn ok(body: Value) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    fn client(transport: Arc<ScriptedTransport>) -> ScmClient {
        ScmClient::builder()
            .static_token("test-token")
            .base_url("https://api.test")
            .transport(transport)
            .build()
            .unwrap()
    }

    const ID: &str = "2bb8c8a4-7d6c-4f6b-9c52-3a5f0f1d6e11";

    #[tokio::test]
    async fn test_create_with_two_containers_sends_nothing() {
        let transport = ScriptedTransport::new(vec![]);
        let service = client(transport.clone()).resource::<Addresses>().unwrap();
        let payload = AddressCreate {
            fields: AddressFields::ip_netmask("web", "10.0.0.1/32"),
            container: ContainerFields {
                folder: Some("Texas".into()),
                device: Some("fw-01".into()),
                ..Default::default()
            },
        };

        let err = service.create(&payload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidObject);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_moves_id_into_path() {
        let transport = ScriptedTransport::new(vec![ok(
            json!({"id": ID, "name": "web", "fqdn": "a.example.com", "folder": "Texas"}),
        )]);
        let service = client(transport.clone()).raw_resource("addresses").unwrap();
        service
            .update(&json!({"id": ID, "name": "web", "fqdn": "a.example.com", "folder": "Texas"}))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Put);
        assert!(requests[0].url.ends_with(&format!("/config/objects/v1/addresses/{}", ID)));
        match &requests[0].body {
            crate::scm::http::RequestBody::Json(body) => assert!(body.get("id").is_none()),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_raw_service_applies_typed_rules() {
        let transport = ScriptedTransport::new(vec![]);
        let service = client(transport.clone())
            .raw_resource("route-redistribution-profiles")
            .unwrap();

        let err = service
            .create(&json!({
                "name": "bad",
                "folder": "Texas",
                "protocol": {"bgp_to_ospf": {"redistribute_static": {}}}
            }))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScmError::InvalidObject(ValidationError::IllegalCombination { .. })
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_raw_service_for_untyped_key() {
        let transport = ScriptedTransport::new(vec![ok(
            json!({"id": ID, "name": "prod", "color": "Red", "folder": "Texas"}),
        )]);
        let service = client(transport.clone()).raw_resource("tags").unwrap();
        let created = service
            .create(&json!({"name": "prod", "color": "Red", "folder": "Texas"}))
            .await
            .unwrap();
        assert_eq!(created["color"], "Red");

        let err = client(transport).raw_resource("no-such-thing").err().unwrap();
        assert!(matches!(
            err,
            ScmError::InvalidObject(ValidationError::UnknownResource { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_rejects_non_uuid() {
        let transport = ScriptedTransport::new(vec![]);
        let service = client(transport.clone()).resource::<Addresses>().unwrap();
        let err = service.get("../tags").await.unwrap_err();
        assert!(matches!(
            err,
            ScmError::InvalidObject(ValidationError::InvalidIdentifier { .. })
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_collection_is_invalid_object() {
        let transport = ScriptedTransport::new(vec![ok(json!({"items": []}))]);
        let service = client(transport).resource::<Addresses>().unwrap();
        let err = service
            .list(&Container::Folder("Texas".into()), &ListOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScmError::InvalidObject(ValidationError::MissingCollection { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_stops_on_short_page() {
        let page = |n: usize| {
            let items: Vec<Value> = (0..n)
                .map(|i| json!({"id": ID, "name": format!("a{}", i), "fqdn": "x", "folder": "Texas"}))
                .collect();
            ok(json!({"data": items, "limit": 2, "offset": 0, "total": 5}))
        };
        let transport = ScriptedTransport::new(vec![page(2), page(2), page(1)]);
        let service = client(transport.clone()).resource::<Addresses>().unwrap();

        let items = service
            .list(&Container::Folder("Texas".into()), &ListOptions::new().max_limit(2))
            .await
            .unwrap();

        assert_eq!(items.len(), 5);
        let offsets: Vec<String> = transport
            .requests()
            .iter()
            .map(|r| {
                r.query
                    .iter()
                    .find(|(k, _)| k == "offset")
                    .map(|(_, v)| v.clone())
                    .unwrap()
            })
            .collect();
        assert_eq!(offsets, vec!["0", "2", "4"]);
    }

    #[tokio::test]
    async fn test_fetch_requires_exact_name_and_container() {
        let transport = ScriptedTransport::new(vec![ok(json!({"data": [
            {"id": ID, "name": "web", "fqdn": "x", "folder": "Shared"},
            {"id": ID, "name": "web-2", "fqdn": "x", "folder": "Texas"},
            {"id": ID, "name": "web", "fqdn": "y", "folder": "Texas"}
        ]}))]);
        let service = client(transport.clone()).resource::<Addresses>().unwrap();

        let found = service
            .fetch("web", &Container::Folder("Texas".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.fields.fqdn.as_deref(), Some("y"));

        let query = &transport.requests()[0].query;
        assert!(query.contains(&("name".to_string(), "web".to_string())));
        assert!(query.contains(&("folder".to_string(), "Texas".to_string())));
    }

    #[tokio::test]
    async fn test_delete_if_present_tolerates_404() {
        let transport = ScriptedTransport::new(vec![HttpResponse {
            status: 404,
            body: json!({"_errors": [{"code": "API_I00013", "message": "Object not present"}]})
                .to_string(),
        }]);
        let service = client(transport).resource::<Addresses>().unwrap();
        assert!(!service.delete_if_present(ID).await.unwrap());
    }
}
