//! Request lifecycle tests
//!
//! Ownership, paid request creation, fulfillment, withdrawal and cancellation
//! driven through the public broker API with a cooperative consumer.

use std::sync::Arc;

use runlink_core::{InMemoryToken, Oracle, PaymentLedger, RecordingConsumer};
use runlink_types::{
    Address, Amount, CallbackOutcome, ExternalId, OracleError, OracleEvent, RequestId, Selector,
    WorkRequest,
};

const SPEC_ID: &str = "4c7b7ffb66b344fbaa64995af81e355a";

struct Harness {
    oracle: Oracle,
    default_account: Address,
    oracle_node: Address,
    stranger: Address,
}

impl Harness {
    fn new() -> Self {
        let default_account = Address::from_label("default-account");
        let oracle_node = Address::from_label("oracle-node");
        let token = InMemoryToken::new(Address::from_label("link-token"))
            .with_balance(default_account, Amount::tokens(1_000));

        let mut oracle = Oracle::new(Address::from_label("oracle"), default_account, token);
        oracle
            .transfer_ownership(&default_account, oracle_node)
            .unwrap();
        oracle.take_events();

        Self {
            oracle,
            default_account,
            oracle_node,
            stranger: Address::from_label("stranger"),
        }
    }

    fn fund(&mut self, account: Address, amount: Amount) {
        let from = self.default_account;
        self.oracle
            .token_mut()
            .transfer(&from, &account, amount)
            .unwrap();
    }

    fn balance(&self, account: &Address) -> Amount {
        self.oracle.token().balance_of(account)
    }

    /// Paid request from the default account
    fn request(&mut self, callback: Address, external_id: &str, paid: Amount) -> RequestId {
        let from = self.default_account;
        self.oracle
            .transfer_and_call(&from, paid, &payload(callback, external_id))
            .unwrap()
    }

    fn deploy_getter_setter(&mut self) -> (Address, Arc<RecordingConsumer>) {
        let address = Address::from_label("getter-setter");
        let consumer = Arc::new(RecordingConsumer::new());
        self.oracle.deploy_consumer(address, consumer.clone());
        (address, consumer)
    }
}

fn selector() -> Selector {
    Selector::from_signature("requestedBytes32(bytes32,bytes32)")
}

fn payload(callback: Address, external_id: &str) -> Vec<u8> {
    WorkRequest::new(SPEC_ID, callback, selector(), external_id)
        .encode()
        .unwrap()
}

// ============ Ownership ============

#[test]
fn test_owner_can_change_owner() {
    let mut h = Harness::new();
    let (node, stranger) = (h.oracle_node, h.stranger);

    h.oracle.transfer_ownership(&node, stranger).unwrap();
    assert_eq!(h.oracle.owner(), Some(&stranger));

    let events = h.oracle.take_events();
    assert!(matches!(
        events.as_slice(),
        [OracleEvent::OwnershipTransferred { previous_owner: Some(p), new_owner: Some(n), .. }]
            if *p == node && *n == stranger
    ));
}

#[test]
fn test_non_owner_cannot_change_owner() {
    let mut h = Harness::new();
    let stranger = h.stranger;

    let result = h.oracle.transfer_ownership(&stranger, stranger);
    assert!(matches!(result, Err(OracleError::Unauthorized { .. })));
    assert_eq!(h.oracle.owner(), Some(&h.oracle_node));
}

// ============ Payment notifications ============

#[test]
fn test_token_notification_opens_request() {
    let mut h = Harness::new();
    let callback = Address::from_label("callback");
    let id = h.request(callback, "id", Amount::zero());

    let events = h.oracle.take_events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        OracleEvent::RunRequest {
            internal_id,
            requester,
            spec_id,
            amount,
            version,
            ..
        } => {
            assert_eq!(internal_id, &id);
            assert_eq!(requester, &h.default_account);
            assert_eq!(spec_id.as_str(), SPEC_ID);
            assert_eq!(amount, &Amount::zero());
            assert_eq!(*version, 1);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_run_request_reports_amount_paid() {
    let mut h = Harness::new();
    h.request(Address::from_label("callback"), "id", Amount::new(100));

    let events = h.oracle.take_events();
    assert!(matches!(
        events.last(),
        Some(OracleEvent::RunRequest { amount, .. }) if *amount == Amount::new(100)
    ));
}

#[test]
fn test_notification_without_data_fails() {
    let mut h = Harness::new();
    let from = h.default_account;
    let before = h.balance(&from);

    let result = h.oracle.transfer_and_call(&from, Amount::zero(), b"");
    assert!(matches!(result, Err(OracleError::MalformedPayload { .. })));
    assert_eq!(h.balance(&from), before);
    assert!(h.oracle.events().is_empty());
}

#[test]
fn test_notification_from_other_caller_fails() {
    let mut h = Harness::new();
    let node = h.oracle_node;
    let data = payload(Address::from_label("callback"), "id");

    let result = h.oracle.on_token_transfer(&node, node, Amount::zero(), &data);
    assert!(matches!(result, Err(OracleError::UnauthorizedCaller { .. })));
    assert!(h.oracle.open_requests().is_empty());
}

#[test]
fn test_request_data_outside_token_fails() {
    let mut h = Harness::new();
    let node = h.oracle_node;
    let request = WorkRequest::new(SPEC_ID, Address::from_label("callback"), selector(), "id");

    let result = h.oracle.request_data(&node, node, Amount::new(1), request);
    assert_eq!(result, Err(OracleError::PaymentRequired));
}

// ============ Fulfillment ============

#[test]
fn test_fulfill_by_non_owner_fails() {
    let mut h = Harness::new();
    let (consumer, _) = h.deploy_getter_setter();
    let id = h.request(consumer, "XID", Amount::zero());
    let stranger = h.stranger;

    let result = h.oracle.fulfill_data(&stranger, &id, b"Hello World!");
    assert!(matches!(result, Err(OracleError::Unauthorized { .. })));
    assert!(h.oracle.slot(&id).is_open());
}

#[test]
fn test_fulfill_unknown_request_fails() {
    let mut h = Harness::new();
    let node = h.oracle_node;
    let unknown = RequestId::from_bytes([0xde; 32]);

    let result = h.oracle.fulfill_data(&node, &unknown, b"Hello World!");
    assert!(matches!(result, Err(OracleError::UnknownRequest { .. })));
}

#[test]
fn test_fulfill_sets_value_on_consumer() {
    let mut h = Harness::new();
    let (consumer, getter_setter) = h.deploy_getter_setter();
    let id = h.request(consumer, "XID", Amount::zero());
    let node = h.oracle_node;

    let receipt = h.oracle.fulfill_data(&node, &id, b"Hello World!").unwrap();
    assert_eq!(receipt.outcome, CallbackOutcome::Delivered);

    let delivered = getter_setter.last().unwrap();
    assert_eq!(delivered.external_id, ExternalId::new("XID"));
    assert_eq!(delivered.selector, selector());
    assert_eq!(delivered.response, b"Hello World!".to_vec());
}

#[test]
fn test_fulfill_twice_fails() {
    let mut h = Harness::new();
    let (consumer, getter_setter) = h.deploy_getter_setter();
    let id = h.request(consumer, "XID", Amount::zero());
    let node = h.oracle_node;

    h.oracle.fulfill_data(&node, &id, b"First message!").unwrap();
    let result = h.oracle.fulfill_data(&node, &id, b"Second message!!");
    assert!(matches!(result, Err(OracleError::UnknownRequest { .. })));
    assert_eq!(getter_setter.received().len(), 1);
}

#[test]
fn test_fulfill_with_tampered_terms_fails() {
    let mut h = Harness::new();
    let (consumer, getter_setter) = h.deploy_getter_setter();
    let id = h.request(consumer, "XID", Amount::new(10));
    let node = h.oracle_node;

    let mut terms = h.oracle.request_terms(&id).unwrap();
    terms.callback_address = h.stranger;
    let result = h.oracle.fulfill(&node, &id, b"value", &terms);
    assert!(matches!(result, Err(OracleError::TermMismatch { .. })));
    assert!(getter_setter.received().is_empty());
    assert_eq!(h.oracle.withdrawable(), Amount::zero());

    let terms = h.oracle.request_terms(&id).unwrap();
    h.oracle.fulfill(&node, &id, b"value", &terms).unwrap();
    assert_eq!(h.oracle.withdrawable(), Amount::new(10));
}

// ============ Withdrawal ============

#[test]
fn test_withdraw_without_funds_does_nothing() {
    let mut h = Harness::new();
    let node = h.oracle_node;

    let result = h.oracle.withdraw(&node, node, Amount::tokens(1));
    assert!(matches!(result, Err(OracleError::InsufficientWithdrawable { .. })));
    assert_eq!(h.balance(&node), Amount::zero());
}

fn reserved_fifteen() -> (Harness, RequestId) {
    let mut h = Harness::new();
    let (consumer, _) = h.deploy_getter_setter();
    let id = h.request(consumer, "id", Amount::new(15));
    (h, id)
}

#[test]
fn test_reserved_funds_cannot_be_withdrawn() {
    let (mut h, _) = reserved_fifteen();
    let node = h.oracle_node;

    let result = h.oracle.withdraw(&node, node, Amount::new(15));
    assert!(result.is_err());
    assert_eq!(h.balance(&node), Amount::zero());
}

#[test]
fn test_withdraw_above_balance_fails() {
    let (mut h, id) = reserved_fifteen();
    let (node, stranger) = (h.oracle_node, h.stranger);
    h.oracle.fulfill_data(&node, &id, b"Hello World!").unwrap();

    let oracle_address = *h.oracle.address();
    let oracle_balance = h.balance(&oracle_address);
    let withdrawable = h.oracle.withdrawable();
    let total_held = h.oracle.total_held();
    assert_eq!(withdrawable, Amount::new(15));

    let result = h.oracle.withdraw(&node, stranger, Amount::new(16));
    assert!(matches!(
        result,
        Err(OracleError::InsufficientWithdrawable {
            requested: 16,
            available: 15
        })
    ));
    assert_eq!(h.oracle.withdrawable(), withdrawable);
    assert_eq!(h.oracle.total_held(), total_held);
    assert_eq!(h.balance(&oracle_address), oracle_balance);
    assert_eq!(h.balance(&stranger), Amount::zero());
    h.oracle.check_conservation().unwrap();
}

#[test]
fn test_withdraw_partial_balance() {
    let (mut h, id) = reserved_fifteen();
    let (node, stranger) = (h.oracle_node, h.stranger);
    h.oracle.fulfill_data(&node, &id, b"Hello World!").unwrap();

    h.oracle.withdraw(&node, stranger, Amount::new(6)).unwrap();
    let oracle_address = *h.oracle.address();
    assert_eq!(h.balance(&stranger), Amount::new(6));
    assert_eq!(h.balance(&oracle_address), Amount::new(9));
    assert_eq!(h.oracle.withdrawable(), Amount::new(9));
}

#[test]
fn test_withdraw_entire_balance() {
    let (mut h, id) = reserved_fifteen();
    let (node, stranger) = (h.oracle_node, h.stranger);
    h.oracle.fulfill_data(&node, &id, b"Hello World!").unwrap();

    h.oracle.withdraw(&node, stranger, Amount::new(15)).unwrap();
    assert_eq!(h.balance(&stranger), Amount::new(15));
    assert!(matches!(
        h.oracle.take_events().last(),
        Some(OracleEvent::Withdrawn { amount, .. }) if *amount == Amount::new(15)
    ));
}

#[test]
fn test_withdraw_by_non_owner_fails() {
    let (mut h, id) = reserved_fifteen();
    let (node, stranger) = (h.oracle_node, h.stranger);
    h.oracle.fulfill_data(&node, &id, b"Hello World!").unwrap();

    let result = h.oracle.withdraw(&stranger, stranger, Amount::new(15));
    assert!(matches!(result, Err(OracleError::Unauthorized { .. })));
    assert_eq!(h.balance(&stranger), Amount::zero());
}

// ============ Cancellation ============

#[test]
fn test_cancel_without_pending_requests_fails() {
    let mut h = Harness::new();
    let stranger = h.stranger;

    let result = h
        .oracle
        .cancel_by_external_id(&stranger, &ExternalId::new("1337"));
    assert!(matches!(result, Err(OracleError::UnknownRequest { .. })));
}

struct PendingCancel {
    h: Harness,
    requester: Address,
    id: RequestId,
}

const STARTING_BALANCE: u128 = 100;
const REQUEST_AMOUNT: u128 = 20;

fn pending_request() -> PendingCancel {
    let mut h = Harness::new();
    let requester = Address::from_label("consumer");
    h.fund(requester, Amount::new(STARTING_BALANCE));

    let id = h
        .oracle
        .transfer_and_call(
            &requester,
            Amount::new(REQUEST_AMOUNT),
            &payload(requester, "requestId"),
        )
        .unwrap();
    PendingCancel { h, requester, id }
}

#[test]
fn test_pending_request_balances() {
    let p = pending_request();
    let oracle_address = *p.h.oracle.address();
    assert_eq!(p.h.balance(&oracle_address), Amount::new(REQUEST_AMOUNT));
    assert_eq!(
        p.h.balance(&p.requester),
        Amount::new(STARTING_BALANCE - REQUEST_AMOUNT)
    );
    p.h.oracle.check_conservation().unwrap();
}

#[test]
fn test_cancel_by_stranger_fails() {
    let mut p = pending_request();
    let stranger = p.h.stranger;

    // By external id the stranger addresses their own (nonexistent) request
    let result = p
        .h
        .oracle
        .cancel_by_external_id(&stranger, &ExternalId::new("requestId"));
    assert!(matches!(result, Err(OracleError::UnknownRequest { .. })));

    let result = p.h.oracle.cancel(&stranger, &p.id);
    assert!(matches!(result, Err(OracleError::Unauthorized { .. })));

    // Not even the owner may cancel someone else's request
    let node = p.h.oracle_node;
    let result = p.h.oracle.cancel(&node, &p.id);
    assert!(matches!(result, Err(OracleError::Unauthorized { .. })));
    assert!(p.h.oracle.slot(&p.id).is_open());
}

#[test]
fn test_cancel_refunds_requester() {
    let mut p = pending_request();
    let requester = p.requester;

    let refunded = p
        .h
        .oracle
        .cancel_by_external_id(&requester, &ExternalId::new("requestId"))
        .unwrap();
    assert_eq!(refunded, Amount::new(REQUEST_AMOUNT));
    assert_eq!(p.h.balance(&requester), Amount::new(STARTING_BALANCE));
    p.h.oracle.check_conservation().unwrap();

    let events = p.h.oracle.take_events();
    assert!(matches!(
        events.last(),
        Some(OracleEvent::RequestCancelled { internal_id, refunded, .. })
            if *internal_id == p.id && *refunded == Amount::new(REQUEST_AMOUNT)
    ));
}

#[test]
fn test_cancel_twice_fails() {
    let mut p = pending_request();
    let requester = p.requester;

    p.h.oracle.cancel(&requester, &p.id).unwrap();
    let result = p.h.oracle.cancel(&requester, &p.id);
    assert!(matches!(result, Err(OracleError::UnknownRequest { .. })));
    assert_eq!(p.h.balance(&requester), Amount::new(STARTING_BALANCE));
}

#[test]
fn test_cancelled_request_cannot_be_fulfilled() {
    let mut p = pending_request();
    let (requester, node) = (p.requester, p.h.oracle_node);
    let terms = p.h.oracle.request_terms(&p.id).unwrap();

    p.h.oracle.cancel(&requester, &p.id).unwrap();
    let result = p.h.oracle.fulfill(&node, &p.id, b"late", &terms);
    assert!(matches!(result, Err(OracleError::UnknownRequest { .. })));
    assert_eq!(p.h.oracle.withdrawable(), Amount::zero());
}

#[test]
fn test_external_id_reusable_after_close() {
    let mut p = pending_request();
    let requester = p.requester;
    p.h.oracle.cancel(&requester, &p.id).unwrap();

    let id = p
        .h
        .oracle
        .transfer_and_call(&requester, Amount::new(5), &payload(requester, "requestId"))
        .unwrap();
    assert_eq!(id, p.id);
    assert_eq!(p.h.oracle.request_terms(&id).unwrap().amount, Amount::new(5));
}
