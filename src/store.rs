//! The RPC boundary: one method per store operation, speaking the SDK's own request and
//! response shapes.

use crate::error::{Error, Result};

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    Client,
    operation::{
        batch_get_item::{BatchGetItemInput, BatchGetItemOutput},
        batch_write_item::{BatchWriteItemInput, BatchWriteItemOutput},
        delete_item::{DeleteItemInput, DeleteItemOutput},
        get_item::{GetItemInput, GetItemOutput},
        put_item::{PutItemInput, PutItemOutput},
        query::{QueryInput, QueryOutput},
        scan::{ScanInput, ScanOutput},
        transact_get_items::{TransactGetItemsError, TransactGetItemsInput, TransactGetItemsOutput},
        transact_write_items::{
            TransactWriteItemsError, TransactWriteItemsInput, TransactWriteItemsOutput,
        },
        update_item::{UpdateItemInput, UpdateItemOutput},
    },
};

/// Sends requests to the backing store.
///
/// Implementations must not retry conditional-check failures or transaction cancellations;
/// those are surfaced to the caller.
#[async_trait]
pub trait Store: Send + Sync {
    /// GetItem.
    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput>;
    /// PutItem.
    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput>;
    /// UpdateItem.
    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput>;
    /// DeleteItem.
    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput>;
    /// Query, one page.
    async fn query(&self, input: QueryInput) -> Result<QueryOutput>;
    /// Scan, one page.
    async fn scan(&self, input: ScanInput) -> Result<ScanOutput>;
    /// BatchGetItem.
    async fn batch_get_item(&self, input: BatchGetItemInput) -> Result<BatchGetItemOutput>;
    /// BatchWriteItem.
    async fn batch_write_item(&self, input: BatchWriteItemInput) -> Result<BatchWriteItemOutput>;
    /// TransactGetItems.
    async fn transact_get_items(
        &self,
        input: TransactGetItemsInput,
    ) -> Result<TransactGetItemsOutput>;
    /// TransactWriteItems.
    async fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput>;
}

#[async_trait]
impl Store for Client {
    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput> {
        self.get_item()
            .set_attributes_to_get(input.attributes_to_get)
            .set_consistent_read(input.consistent_read)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_key(input.key)
            .set_projection_expression(input.projection_expression)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_table_name(input.table_name)
            .send()
            .await
            .map_err(Error::from_sdk)
    }

    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput> {
        self.put_item()
            .set_condition_expression(input.condition_expression)
            .set_conditional_operator(input.conditional_operator)
            .set_expected(input.expected)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_item(input.item)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .set_return_values(input.return_values)
            .set_return_values_on_condition_check_failure(
                input.return_values_on_condition_check_failure,
            )
            .set_table_name(input.table_name)
            .send()
            .await
            .map_err(Error::from_sdk)
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput> {
        self.update_item()
            .set_attribute_updates(input.attribute_updates)
            .set_condition_expression(input.condition_expression)
            .set_conditional_operator(input.conditional_operator)
            .set_expected(input.expected)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_key(input.key)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .set_return_values(input.return_values)
            .set_return_values_on_condition_check_failure(
                input.return_values_on_condition_check_failure,
            )
            .set_table_name(input.table_name)
            .set_update_expression(input.update_expression)
            .send()
            .await
            .map_err(Error::from_sdk)
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput> {
        self.delete_item()
            .set_condition_expression(input.condition_expression)
            .set_conditional_operator(input.conditional_operator)
            .set_expected(input.expected)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_key(input.key)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .set_return_values(input.return_values)
            .set_return_values_on_condition_check_failure(
                input.return_values_on_condition_check_failure,
            )
            .set_table_name(input.table_name)
            .send()
            .await
            .map_err(Error::from_sdk)
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput> {
        self.query()
            .set_attributes_to_get(input.attributes_to_get)
            .set_conditional_operator(input.conditional_operator)
            .set_consistent_read(input.consistent_read)
            .set_exclusive_start_key(input.exclusive_start_key)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_filter_expression(input.filter_expression)
            .set_index_name(input.index_name)
            .set_key_condition_expression(input.key_condition_expression)
            .set_key_conditions(input.key_conditions)
            .set_limit(input.limit)
            .set_projection_expression(input.projection_expression)
            .set_query_filter(input.query_filter)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_scan_index_forward(input.scan_index_forward)
            .set_select(input.select)
            .set_table_name(input.table_name)
            .send()
            .await
            .map_err(Error::from_sdk)
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput> {
        self.scan()
            .set_attributes_to_get(input.attributes_to_get)
            .set_conditional_operator(input.conditional_operator)
            .set_consistent_read(input.consistent_read)
            .set_exclusive_start_key(input.exclusive_start_key)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_filter_expression(input.filter_expression)
            .set_index_name(input.index_name)
            .set_limit(input.limit)
            .set_projection_expression(input.projection_expression)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_scan_filter(input.scan_filter)
            .set_segment(input.segment)
            .set_select(input.select)
            .set_table_name(input.table_name)
            .set_total_segments(input.total_segments)
            .send()
            .await
            .map_err(Error::from_sdk)
    }

    async fn batch_get_item(&self, input: BatchGetItemInput) -> Result<BatchGetItemOutput> {
        self.batch_get_item()
            .set_request_items(input.request_items)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .send()
            .await
            .map_err(Error::from_sdk)
    }

    async fn batch_write_item(&self, input: BatchWriteItemInput) -> Result<BatchWriteItemOutput> {
        self.batch_write_item()
            .set_request_items(input.request_items)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .send()
            .await
            .map_err(Error::from_sdk)
    }

    async fn transact_get_items(
        &self,
        input: TransactGetItemsInput,
    ) -> Result<TransactGetItemsOutput> {
        self.transact_get_items()
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_transact_items(input.transact_items)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(TransactGetItemsError::TransactionCanceledException(cancelled)) => {
                    Error::TransactionCancelled {
                        message: cancelled.message().unwrap_or_default().to_string(),
                        reasons: cancelled
                            .cancellation_reasons()
                            .iter()
                            .map(Into::into)
                            .collect(),
                    }
                }
                _ => Error::from_sdk(err),
            })
    }

    async fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput> {
        self.transact_write_items()
            .set_client_request_token(input.client_request_token)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .set_transact_items(input.transact_items)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(TransactWriteItemsError::TransactionCanceledException(cancelled)) => {
                    Error::TransactionCancelled {
                        message: cancelled.message().unwrap_or_default().to_string(),
                        reasons: cancelled
                            .cancellation_reasons()
                            .iter()
                            .map(Into::into)
                            .collect(),
                    }
                }
                _ => Error::from_sdk(err),
            })
    }
}
