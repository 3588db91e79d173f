use std::sync::Arc;

use macprov::{CmacContext, GmacContext, MacContext, ProviderContext};
use macprov_core::params::{Param, MAC_PARAM_CIPHER, MAC_PARAM_IV};

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_cmac_aes256(bencher: divan::Bencher, size: usize) {
    let provider = ProviderContext::standard();
    let mut base = CmacContext::new(Arc::clone(&provider)).unwrap();
    base.set_params(&[Param::utf8_string(MAC_PARAM_CIPHER, "AES-256-CBC")])
        .unwrap();
    base.init(Some(&[0x42u8; 32])).unwrap();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            let mut ctx = base.duplicate().unwrap();
            ctx.update(divan::black_box(&data)).unwrap();
            ctx.finalize_vec().unwrap()
        });
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_gmac_aes256(bencher: divan::Bencher, size: usize) {
    let provider = ProviderContext::standard();
    let mut base = GmacContext::new(provider).unwrap();
    base.set_params(&[
        Param::utf8_string(MAC_PARAM_CIPHER, "AES-256-GCM"),
        Param::octet_string(MAC_PARAM_IV, [0u8; 12]),
    ])
    .unwrap();
    base.init(Some(&[0x42u8; 32])).unwrap();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            let mut ctx = base.duplicate().unwrap();
            ctx.update(divan::black_box(&data)).unwrap();
            ctx.finalize_vec().unwrap()
        });
}

fn main() {
    divan::main();
}
