use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use bankline_accounts::{
    AccountService, AccountType, LedgerPolicy, LedgerService, OpenAccountRequest, TransactionRequest,
    TransactionType,
};
use bankline_core::{AccountId, CustomerId, Money};
use bankline_infra::InMemoryAccountRepository;
use tokio::runtime::Runtime;

type Service = Arc<LedgerService<Arc<InMemoryAccountRepository>>>;

fn setup(rt: &Runtime, accounts: usize) -> (Service, Vec<AccountId>) {
    let customer = CustomerId::new(1);
    let repo = Arc::new(InMemoryAccountRepository::with_customers([customer]));
    let service = Arc::new(LedgerService::new(repo, LedgerPolicy::default()));

    let ids = rt.block_on(async {
        let mut ids = Vec::with_capacity(accounts);
        for _ in 0..accounts {
            let account = service
                .open_account(OpenAccountRequest {
                    customer_id: customer,
                    account_type: AccountType::Checking,
                    amount: Money::from_cents(1_000_000),
                })
                .await
                .unwrap();
            ids.push(account.id);
        }
        ids
    });

    (service, ids)
}

fn deposit(account_id: AccountId) -> TransactionRequest {
    TransactionRequest {
        account_id,
        customer_id: CustomerId::new(1),
        transaction_type: TransactionType::Deposit,
        amount: Money::from_cents(black_box(100)),
    }
}

fn bench_transaction_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("transaction_latency");
    group.sample_size(1000);

    group.bench_function("deposit_single_account", |b| {
        let (service, ids) = setup(&rt, 1);
        b.iter(|| {
            rt.block_on(service.make_transaction(deposit(ids[0]))).unwrap();
        });
    });

    group.bench_function("rejected_withdrawal", |b| {
        let (service, ids) = setup(&rt, 1);
        let request = TransactionRequest {
            transaction_type: TransactionType::Withdrawal,
            amount: Money::from_cents(i64::MAX),
            ..deposit(ids[0])
        };
        b.iter(|| {
            black_box(rt.block_on(service.make_transaction(request))).unwrap_err();
        });
    });

    group.finish();
}

/// Same number of concurrent deposits, either all queued on one account or
/// spread over independent accounts.
fn bench_contended_vs_spread(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("concurrent_deposits");

    for tasks in [8usize, 64].iter() {
        group.throughput(Throughput::Elements(*tasks as u64));

        group.bench_with_input(BenchmarkId::new("one_account", tasks), tasks, |b, &n| {
            let (service, ids) = setup(&rt, 1);
            b.iter(|| run_concurrently(&rt, &service, vec![ids[0]; n]));
        });

        group.bench_with_input(BenchmarkId::new("spread_accounts", tasks), tasks, |b, &n| {
            let (service, ids) = setup(&rt, n);
            b.iter(|| run_concurrently(&rt, &service, ids.clone()));
        });
    }

    group.finish();
}

fn run_concurrently(rt: &Runtime, service: &Service, targets: Vec<AccountId>) {
    rt.block_on(async {
        let handles: Vec<_> = targets
            .into_iter()
            .map(|id| {
                let service = Arc::clone(service);
                tokio::spawn(async move { service.make_transaction(deposit(id)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    });
}

criterion_group!(benches, bench_transaction_latency, bench_contended_vs_spread);
criterion_main!(benches);
