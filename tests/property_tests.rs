use amlres::checksum::crc32;
use amlres::header::HEADER_SIZE;
use amlres::image::{self, Asset, PackOptions};
use amlres::item::ITEM_SIZE;
use amlres::{classify, CodecId, Container};
use proptest::prelude::*;

fn asset_strategy() -> impl Strategy<Value = Vec<Asset>> {
    prop::collection::vec(
        (prop::collection::vec(any::<u8>(), 0..300), any::<bool>()),
        1..8,
    )
    .prop_map(|items| {
        items.into_iter().enumerate().map(|(i, (data, gz))| Asset {
            name:  format!("asset_{i}"),
            data,
            codec: if gz { CodecId::Gzip } else { CodecId::Stored },
        }).collect()
    })
}

proptest! {
    #[test]
    fn chain_index_and_crc_hold(assets in asset_strategy(), align_pow in 0u32..7) {
        let opts = PackOptions { alignment: 1 << align_pow, ..PackOptions::default() };
        let mut container = image::build(&assets, &opts).unwrap();
        let bytes = container.pack();
        let parsed = Container::from_bytes(&bytes).unwrap();
        let n = assets.len();

        prop_assert_eq!(parsed.len(), n);
        prop_assert_eq!(parsed.header.total_size as usize, bytes.len());
        let data_start = HEADER_SIZE + ITEM_SIZE * n;
        prop_assert_eq!(parsed.header.crc, crc32(&bytes[data_start..]));

        let mut last_start = 0u32;
        for (i, item) in parsed.items.iter().enumerate() {
            prop_assert_eq!(item.entry.index as usize, i);
            let next = if i + 1 < n { (HEADER_SIZE + ITEM_SIZE * (i + 1)) as u32 } else { 0 };
            prop_assert_eq!(item.entry.next, next);
            prop_assert!(item.entry.start as usize >= data_start);
            prop_assert!(item.entry.start >= last_start);
            prop_assert_eq!((item.entry.start as usize - data_start) % opts.alignment as usize, 0);
            last_start = item.entry.start;
        }
    }

    #[test]
    fn payloads_survive_pack_and_walk(assets in asset_strategy()) {
        let mut container = image::build(&assets, &PackOptions::default()).unwrap();
        let parsed = Container::from_bytes(&container.pack()).unwrap();
        for (asset, item) in assets.iter().zip(&parsed.items) {
            prop_assert_eq!(&item.entry.name, &asset.name);
            let class = classify(&item.payload);
            match asset.codec {
                CodecId::Gzip => {
                    let content = class.content(&item.payload);
                    prop_assert_eq!(content, asset.data.as_slice());
                }
                CodecId::Stored => {
                    prop_assert_eq!(&item.payload, &asset.data);
                }
            }
        }
    }

    #[test]
    fn walker_never_panics_on_garbage(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = Container::from_bytes(&bytes);
    }
}
