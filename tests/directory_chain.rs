extern crate tiff_chain;

use std::io::Cursor;

use tiff_chain::tags::{ByteOrder, IfdPointer, Tag};
use tiff_chain::{DirectoryChain, DirectoryNumber, SubIfdLayout, TiffError, TiffKind};
use tiff_chain::{Directory, TiffFormatError};

type Chain = DirectoryChain<Cursor<Vec<u8>>>;

fn new_chain(kind: TiffKind, byte_order: ByteOrder) -> Chain {
    DirectoryChain::create(Cursor::new(Vec::new()), byte_order, kind).unwrap()
}

fn reopen(chain: Chain) -> Chain {
    DirectoryChain::open(chain.into_inner()).unwrap()
}

fn marked_directory(marker: u32) -> Directory {
    let mut dir = Directory::empty();
    dir.set(Tag::ImageWidth, &marker).unwrap();
    dir.set(Tag::ImageDescription, format!("directory {marker}").as_str())
        .unwrap();
    dir
}

fn write_marked(chain: &mut Chain, markers: impl IntoIterator<Item = u32>) {
    for marker in markers {
        *chain.create_directory() = marked_directory(marker);
        chain.write_directory().unwrap();
    }
}

fn marker(chain: &Chain) -> u32 {
    chain
        .current()
        .get(Tag::ImageWidth)
        .expect("directory carries a marker")
        .value()
        .unwrap()
        .into_u32()
        .unwrap()
}

fn offset_of(chain: &mut Chain, n: u64) -> IfdPointer {
    chain.set_directory(n).unwrap();
    chain.current_offset().unwrap()
}

#[test]
fn round_trip_append() {
    for kind in [TiffKind::Standard, TiffKind::Big] {
        for byte_order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            for n in [1u32, 2, 7] {
                let mut chain = new_chain(kind, byte_order);
                write_marked(&mut chain, 0..n);

                let mut chain = reopen(chain);
                assert_eq!(chain.kind(), kind);
                assert_eq!(chain.byte_order(), byte_order);
                assert_eq!(chain.current_directory(), DirectoryNumber::Known(0));

                for i in 0..n {
                    chain.set_directory(u64::from(i)).unwrap();
                    assert_eq!(chain.current_directory(), DirectoryNumber::Known(i.into()));
                    assert_eq!(marker(&chain), i);
                    let description = chain
                        .current()
                        .get(Tag::ImageDescription)
                        .unwrap()
                        .value()
                        .unwrap()
                        .into_string()
                        .unwrap();
                    assert_eq!(description, format!("directory {i}"));
                }
                assert_eq!(chain.number_of_directories().unwrap(), u64::from(n));
            }
        }
    }
}

#[test]
fn write_leaves_a_blank_directory() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..2);

    assert_eq!(chain.current_directory(), DirectoryNumber::Known(1));
    assert!(chain.current().is_empty());
    assert_eq!(chain.current_offset(), None);
    assert!(!chain.more_directories().unwrap());
}

#[test]
fn offset_cache_equivalence() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..6);
    let store = chain.into_inner();

    let mut chain = DirectoryChain::open(store.clone()).unwrap();
    let mut sequential = vec![chain.current_offset().unwrap()];
    while chain.read_next().unwrap() {
        sequential.push(chain.current_offset().unwrap());
        assert_eq!(
            chain.current_directory(),
            DirectoryNumber::Known(sequential.len() as u64 - 1)
        );
    }
    // The end of the chain does not change the position.
    assert_eq!(chain.current_directory(), DirectoryNumber::Known(5));

    let mut chain = DirectoryChain::open_deferred(store.clone()).unwrap();
    let ascending: Vec<_> = (0..6).map(|i| offset_of(&mut chain, i)).collect();

    let mut chain = DirectoryChain::open_deferred(store).unwrap();
    let mut descending: Vec<_> = (0..6).rev().map(|i| offset_of(&mut chain, i)).collect();
    descending.reverse();

    assert_eq!(sequential.len(), 6);
    assert_eq!(sequential, ascending);
    assert_eq!(sequential, descending);

    let walked: Vec<_> = chain
        .directories()
        .unwrap()
        .map(|item| item.unwrap().1)
        .collect();
    assert_eq!(sequential, walked);
}

#[test]
fn directory_past_the_end_is_not_found() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..3);

    let err = chain.set_directory(5).unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, TiffError::DirectoryNotFound(5, 3)));
    assert_eq!(chain.current_directory(), DirectoryNumber::Unknown);
    assert!(chain.current().is_empty());

    chain.set_directory(2).unwrap();
    assert_eq!(marker(&chain), 2);
}

#[test]
fn rewrite_preserves_ordinal_and_moves_offset() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..5);

    let before = offset_of(&mut chain, 2);
    chain.current_mut().set(Tag::Software, "rewritten").unwrap();
    chain.rewrite_directory().unwrap();
    assert_eq!(chain.current_directory(), DirectoryNumber::Known(2));
    assert!(chain.current().is_empty());

    chain.set_directory(2).unwrap();
    assert_ne!(chain.current_offset().unwrap(), before);
    assert_eq!(marker(&chain), 2);
    let software = chain.current().get(Tag::Software).unwrap().value().unwrap();
    assert_eq!(software.into_string().unwrap(), "rewritten");
    assert_eq!(chain.number_of_directories().unwrap(), 5);

    let mut chain = reopen(chain);
    let markers: Vec<u32> = (0..5)
        .map(|i| {
            chain.set_directory(i).unwrap();
            marker(&chain)
        })
        .collect();
    assert_eq!(markers, [0, 1, 2, 3, 4]);
}

#[test]
fn rewrite_first_directory_moves_root() {
    let mut chain = new_chain(TiffKind::Big, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..3);

    let before = offset_of(&mut chain, 0);
    assert_eq!(chain.root().unwrap(), Some(before));
    chain.rewrite_directory().unwrap();

    let moved = chain.root().unwrap().unwrap();
    assert_ne!(moved, before);
    assert_eq!(offset_of(&mut chain, 0), moved);
    assert_eq!(marker(&chain), 0);
    chain.set_directory(2).unwrap();
    assert_eq!(marker(&chain), 2);
}

#[test]
fn repeated_rewrites_find_the_current_predecessor() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::BigEndian);
    write_marked(&mut chain, 0..4);

    let mut seen = vec![offset_of(&mut chain, 2)];
    for round in 0..3u32 {
        chain.set_directory(2).unwrap();
        chain
            .current_mut()
            .set(Tag::PageNumber, &[round as u16, 4][..])
            .unwrap();
        chain.rewrite_directory().unwrap();

        let now = offset_of(&mut chain, 2);
        assert!(!seen.contains(&now));
        seen.push(now);
        assert_eq!(chain.number_of_directories().unwrap(), 4);
    }

    let mut chain = reopen(chain);
    for i in 0..4 {
        chain.set_directory(i).unwrap();
        assert_eq!(u64::from(marker(&chain)), i);
    }
}

#[test]
fn append_after_rewrite_finds_the_real_tail() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..3);

    // Relocate the last directory, the block written last is no longer the tail.
    chain.set_directory(2).unwrap();
    chain.rewrite_directory().unwrap();
    write_marked(&mut chain, [3]);
    assert_eq!(chain.current_directory(), DirectoryNumber::Known(3));

    let mut chain = reopen(chain);
    assert_eq!(chain.number_of_directories().unwrap(), 4);
    chain.set_directory(3).unwrap();
    assert_eq!(marker(&chain), 3);
}

#[test]
fn rewrite_of_a_new_directory_appends() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..1);
    *chain.create_directory() = marked_directory(1);
    chain.rewrite_directory().unwrap();

    assert_eq!(chain.current_directory(), DirectoryNumber::Known(1));
    assert_eq!(chain.number_of_directories().unwrap(), 2);
}

#[test]
fn rewriting_a_detached_directory_is_refused() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    let mut loose = marked_directory(9);
    let offset = chain.write_custom_directory(&mut loose).unwrap();
    write_marked(&mut chain, 0..1);

    chain.set_sub_directory(offset).unwrap();
    let err = chain.rewrite_directory().unwrap_err();
    assert!(err.is_usage());
    // Nothing was lost.
    assert_eq!(marker(&chain), 9);
}

#[test]
fn unlink_shifts_ordinals_down() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..10);
    let k = 4;

    chain.set_directory(7).unwrap();
    chain.unlink_directory(k + 1).unwrap();
    assert_eq!(chain.current_directory(), DirectoryNumber::Unknown);
    assert!(chain.current().is_empty());

    chain.set_directory(k).unwrap();
    assert_eq!(marker(&chain), 5);
    chain.set_directory(k - 1).unwrap();
    assert_eq!(marker(&chain), 3);
    assert_eq!(chain.number_of_directories().unwrap(), 9);

    let markers: Vec<u32> = (0..9)
        .map(|i| {
            chain.set_directory(i).unwrap();
            marker(&chain)
        })
        .collect();
    assert_eq!(markers, [0, 1, 2, 3, 5, 6, 7, 8, 9]);
}

#[test]
fn unlink_first_and_last() {
    let mut chain = new_chain(TiffKind::Big, ByteOrder::BigEndian);
    write_marked(&mut chain, 0..4);

    chain.unlink_directory(1).unwrap();
    chain.set_directory(0).unwrap();
    assert_eq!(marker(&chain), 1);

    chain.unlink_directory(3).unwrap();
    assert_eq!(chain.number_of_directories().unwrap(), 2);
    chain.set_directory(1).unwrap();
    assert_eq!(marker(&chain), 2);
    assert!(!chain.more_directories().unwrap());

    // The tail moved, appending must link behind the new one.
    write_marked(&mut chain, [10]);
    let mut chain = reopen(chain);
    assert_eq!(chain.number_of_directories().unwrap(), 3);
    chain.set_directory(2).unwrap();
    assert_eq!(marker(&chain), 10);
}

#[test]
fn unlink_rejects_bad_numbers() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..2);
    chain.set_directory(1).unwrap();

    let err = chain.unlink_directory(0).unwrap_err();
    assert!(err.is_usage());
    assert!(!err.is_not_found());
    // Rejected before touching anything.
    assert_eq!(chain.current_directory(), DirectoryNumber::Known(1));

    let err = chain.unlink_directory(3).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(chain.number_of_directories().unwrap(), 2);
}

#[test]
fn unlinked_directory_stays_reachable() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..5);

    let orphan = offset_of(&mut chain, 3);
    chain.unlink_directory(4).unwrap();

    chain.set_sub_directory(orphan).unwrap();
    assert_eq!(chain.current_directory(), DirectoryNumber::Unknown);
    assert_eq!(chain.sub_directory_ordinal(), Some(0));
    assert_eq!(marker(&chain), 3);
    let description = chain.current().get(Tag::ImageDescription).unwrap();
    assert_eq!(
        description.value().unwrap().into_string().unwrap(),
        "directory 3"
    );

    chain.set_directory(0).unwrap();
    assert_eq!(chain.current_directory(), DirectoryNumber::Known(0));
    assert_eq!(chain.sub_directory_ordinal(), None);
    chain.set_directory(3).unwrap();
    assert_eq!(marker(&chain), 4);
}

#[test]
fn idempotent_checkpoint() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..2);
    *chain.create_directory() = marked_directory(2);

    chain.checkpoint_directory().unwrap();
    let offset = chain.current_offset().unwrap();
    let bytes = chain.get_ref().get_ref().clone();
    assert_eq!(chain.current_directory(), DirectoryNumber::Known(2));

    chain.checkpoint_directory().unwrap();
    assert_eq!(chain.current_offset(), Some(offset));
    assert_eq!(chain.current_directory(), DirectoryNumber::Known(2));
    assert_eq!(chain.get_ref().get_ref(), &bytes);
    assert_eq!(marker(&chain), 2);
}

#[test]
fn checkpoint_then_write_keeps_a_single_directory() {
    let mut chain = new_chain(TiffKind::Big, ByteOrder::LittleEndian);
    *chain.create_directory() = marked_directory(0);
    chain.checkpoint_directory().unwrap();
    let offset = chain.current_offset().unwrap();

    // Fits the slot, stays in place.
    chain.current_mut().set(Tag::ImageWidth, &42u32).unwrap();
    chain.checkpoint_directory().unwrap();
    assert_eq!(chain.current_offset(), Some(offset));

    // Outgrows the slot, moves.
    chain
        .current_mut()
        .set(Tag::Software, "a rather long software name")
        .unwrap();
    chain.checkpoint_directory().unwrap();
    assert_ne!(chain.current_offset(), Some(offset));
    assert_eq!(chain.current_directory(), DirectoryNumber::Known(0));

    chain.write_directory().unwrap();
    assert_eq!(chain.current_directory(), DirectoryNumber::Known(0));

    let mut chain = reopen(chain);
    assert_eq!(chain.number_of_directories().unwrap(), 1);
    assert_eq!(marker(&chain), 42);
    assert!(chain.current().contains(Tag::Software));
}

#[test]
fn write_of_a_loaded_directory_stays_in_place_when_it_fits() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..3);

    let before = offset_of(&mut chain, 1);
    chain.current_mut().set(Tag::ImageWidth, &100u32).unwrap();
    chain.write_directory().unwrap();
    assert_eq!(chain.current_directory(), DirectoryNumber::Known(1));

    assert_eq!(offset_of(&mut chain, 1), before);
    assert_eq!(marker(&chain), 100);
    chain.set_directory(2).unwrap();
    assert_eq!(marker(&chain), 2);
}

#[test]
fn sub_ifd_local_numbering() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..2);

    *chain.create_directory() = marked_directory(2);
    let mut subs: Vec<Directory> = (100..103).map(marked_directory).collect();
    let offsets = chain
        .write_sub_directories(&mut subs, SubIfdLayout::Chained)
        .unwrap();
    chain.write_directory().unwrap();
    assert_eq!(offsets.len(), 3);

    let mut chain = reopen(chain);
    chain.set_directory(2).unwrap();
    let listed = chain.current().sub_ifds().unwrap();
    assert_eq!(listed, [offsets[0]]);

    chain.set_sub_directory(listed[0]).unwrap();
    let mut seen = vec![(chain.sub_directory_ordinal(), marker(&chain))];
    while chain.read_next().unwrap() {
        assert_eq!(chain.current_directory(), DirectoryNumber::Unknown);
        seen.push((chain.sub_directory_ordinal(), marker(&chain)));
    }
    assert_eq!(
        seen,
        [(Some(0), 100), (Some(1), 101), (Some(2), 102)],
        "SubIFDs are numbered within their own chain"
    );
    assert_eq!(chain.current_directory(), DirectoryNumber::Unknown);
    assert_eq!(chain.sub_directory_ordinal(), Some(2));

    // The main chain is untouched.
    assert_eq!(chain.number_of_directories().unwrap(), 3);
    chain.set_directory(2).unwrap();
    assert_eq!(marker(&chain), 2);
}

#[test]
fn sub_ifd_array() {
    let mut chain = new_chain(TiffKind::Big, ByteOrder::BigEndian);
    *chain.create_directory() = marked_directory(0);
    let mut subs: Vec<Directory> = (10..13).map(marked_directory).collect();
    let offsets = chain
        .write_sub_directories(&mut subs, SubIfdLayout::Array)
        .unwrap();
    chain.write_directory().unwrap();

    let mut chain = reopen(chain);
    assert_eq!(chain.current().sub_ifds().unwrap(), offsets);
    for (i, offset) in offsets.iter().enumerate() {
        chain.set_sub_directory(*offset).unwrap();
        assert_eq!(chain.sub_directory_ordinal(), Some(0));
        assert_eq!(marker(&chain), 10 + i as u32);
        assert!(!chain.read_next().unwrap());
    }
}

#[test]
fn invalidating_sub_directory_call() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..2);
    chain.set_directory(1).unwrap();

    chain.set_sub_directory(IfdPointer(0)).unwrap();
    assert_eq!(chain.current_directory(), DirectoryNumber::Unknown);
    assert!(chain.current().is_empty());
    assert!(!chain.read_next().unwrap());
}

#[test]
fn failed_sub_directory_does_not_recover() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..2);
    chain.set_directory(1).unwrap();

    let err = chain.set_sub_directory(IfdPointer(1 << 20)).unwrap_err();
    assert!(err.is_corrupt());
    assert_eq!(chain.current_directory(), DirectoryNumber::Unknown);
    assert!(chain.current().is_empty());
    assert_eq!(chain.sub_directory_ordinal(), None);

    chain.set_directory(1).unwrap();
    assert_eq!(marker(&chain), 1);
}

#[test]
fn missing_required_tag_still_counts_as_visited() {
    let mut chain = new_chain(TiffKind::Standard, ByteOrder::LittleEndian);
    write_marked(&mut chain, 0..1);
    chain
        .create_directory()
        .set(Tag::Software, "no width")
        .unwrap();
    chain.write_directory().unwrap();
    write_marked(&mut chain, [2]);

    let mut chain = DirectoryChain::open_deferred(chain.into_inner()).unwrap();
    let err = chain.set_directory(1).unwrap_err();
    assert!(matches!(
        err,
        TiffError::FormatError(TiffFormatError::RequiredTagNotFound(Tag::ImageWidth))
    ));
    assert_eq!(chain.current_directory(), DirectoryNumber::Unknown);

    chain.set_directory(2).unwrap();
    assert_eq!(marker(&chain), 2);
    assert_eq!(chain.number_of_directories().unwrap(), 3);
}
