use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};

use crate::aws::{self, Credentials, SigningRequest};

use super::{
    AttrType, AttrValue, Item, TableSpec, TableStatus, TableStore, TableStoreError,
};

/// DynamoDB table store backend, speaking the JSON 1.0 API directly.
pub struct DynamoStore {
    client: Client,
    credentials: Credentials,
    host: String,
    region: String,
}

impl DynamoStore {
    pub fn new(region: &str, credentials: Credentials) -> Result<Self, anyhow::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            credentials,
            host: format!("dynamodb.{region}.amazonaws.com"),
            region: region.to_string(),
        })
    }

    async fn call(&self, target: &str, body: Value) -> Result<Value, TableStoreError> {
        let payload =
            serde_json::to_vec(&body).map_err(|e| TableStoreError::Backend(e.to_string()))?;

        let headers = vec![
            (
                "content-type".to_string(),
                "application/x-amz-json-1.0".to_string(),
            ),
            (
                "x-amz-target".to_string(),
                format!("DynamoDB_20120810.{target}"),
            ),
        ];
        let signed = aws::sign(
            &self.credentials,
            &SigningRequest {
                method: "POST",
                host: &self.host,
                path: "/",
                query: "",
                headers: &headers,
                payload: &payload,
                service: "dynamodb",
                region: &self.region,
                time: Utc::now(),
            },
        );

        let mut request = self
            .client
            .post(format!("https://{}/", self.host))
            .body(payload);
        for (name, value) in headers.iter().chain(signed.iter()) {
            request = request.header(name, value);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| TableStoreError::Backend(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(error_from_response(status, &body));
        }

        resp.json()
            .await
            .map_err(|e| TableStoreError::Backend(e.to_string()))
    }
}

#[async_trait::async_trait]
impl TableStore for DynamoStore {
    async fn list_tables(&self) -> Result<Vec<String>, TableStoreError> {
        let mut names = Vec::new();
        let mut start: Option<String> = None;
        loop {
            let mut body = json!({});
            if let Some(ref name) = start {
                body["ExclusiveStartTableName"] = json!(name);
            }
            let resp = self.call("ListTables", body).await?;
            if let Some(page) = resp.get("TableNames").and_then(Value::as_array) {
                names.extend(page.iter().filter_map(Value::as_str).map(str::to_string));
            }
            match resp.get("LastEvaluatedTableName").and_then(Value::as_str) {
                Some(last) => start = Some(last.to_string()),
                None => break,
            }
        }
        Ok(names)
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<(), TableStoreError> {
        self.call("CreateTable", create_table_body(spec)).await?;
        Ok(())
    }

    async fn delete_table(&self, name: &str) -> Result<(), TableStoreError> {
        self.call("DeleteTable", json!({ "TableName": name })).await?;
        Ok(())
    }

    async fn table_status(&self, name: &str) -> Result<Option<TableStatus>, TableStoreError> {
        let resp = match self.call("DescribeTable", json!({ "TableName": name })).await {
            Ok(resp) => resp,
            Err(TableStoreError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let status = resp
            .pointer("/Table/TableStatus")
            .and_then(Value::as_str)
            .unwrap_or_default();
        match status {
            "ACTIVE" => Ok(Some(TableStatus::Active)),
            "CREATING" => Ok(Some(TableStatus::Creating)),
            "DELETING" => Ok(Some(TableStatus::Deleting)),
            "UPDATING" => Ok(Some(TableStatus::Updating)),
            other => Err(TableStoreError::Backend(format!(
                "Unexpected table status '{other}' for {name}"
            ))),
        }
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), TableStoreError> {
        let attrs: Value = item
            .iter()
            .map(|(name, value)| (name.clone(), attr_value_json(value)))
            .collect::<serde_json::Map<String, Value>>()
            .into();
        self.call("PutItem", json!({ "TableName": table, "Item": attrs }))
            .await?;
        Ok(())
    }
}

fn create_table_body(spec: &TableSpec) -> Value {
    // Attribute definitions cover the primary key plus every index key, deduped
    let mut defs: Vec<(&str, AttrType)> = vec![(spec.hash_key.name.as_str(), spec.hash_key.kind)];
    if let Some(ref range) = spec.range_key {
        defs.push((range.name.as_str(), range.kind));
    }
    for index in &spec.indexes {
        if !defs.iter().any(|(name, _)| *name == index.hash_key.name) {
            defs.push((index.hash_key.name.as_str(), index.hash_key.kind));
        }
    }
    let attribute_definitions: Vec<Value> = defs
        .iter()
        .map(|(name, kind)| {
            json!({ "AttributeName": name, "AttributeType": attr_type_code(*kind) })
        })
        .collect();

    let mut key_schema = vec![json!({ "AttributeName": spec.hash_key.name, "KeyType": "HASH" })];
    if let Some(ref range) = spec.range_key {
        key_schema.push(json!({ "AttributeName": range.name, "KeyType": "RANGE" }));
    }

    let throughput = json!({
        "ReadCapacityUnits": spec.read_units,
        "WriteCapacityUnits": spec.write_units,
    });

    let mut body = json!({
        "TableName": spec.name,
        "AttributeDefinitions": attribute_definitions,
        "KeySchema": key_schema,
        "ProvisionedThroughput": throughput.clone(),
    });

    if !spec.indexes.is_empty() {
        let indexes: Vec<Value> = spec
            .indexes
            .iter()
            .map(|index| {
                json!({
                    "IndexName": index.name,
                    "KeySchema": [
                        { "AttributeName": index.hash_key.name, "KeyType": "HASH" }
                    ],
                    "Projection": { "ProjectionType": "ALL" },
                    "ProvisionedThroughput": throughput.clone(),
                })
            })
            .collect();
        body["GlobalSecondaryIndexes"] = json!(indexes);
    }

    body
}

fn attr_type_code(kind: AttrType) -> &'static str {
    match kind {
        AttrType::N => "N",
        AttrType::S => "S",
    }
}

fn attr_value_json(value: &AttrValue) -> Value {
    match value {
        AttrValue::N(n) => json!({ "N": n }),
        AttrValue::S(s) => json!({ "S": s }),
    }
}

fn error_from_response(status: reqwest::StatusCode, body: &str) -> TableStoreError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let kind = parsed
        .as_ref()
        .and_then(|v| v.get("__type"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("Message")))
        .and_then(Value::as_str)
        .unwrap_or(body)
        .to_string();

    if kind.ends_with("ResourceInUseException") {
        TableStoreError::InUse(message)
    } else if kind.ends_with("ResourceNotFoundException") {
        TableStoreError::NotFound(message)
    } else {
        TableStoreError::Backend(format!("DynamoDB request failed ({status}): {message}"))
    }
}
