#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let store = std::io::Cursor::new(data.to_vec());
    let mut chain = if let Ok(chain) = tiff_chain::DirectoryChain::open_deferred(store) {
        chain
    } else {
        return;
    };

    let mut limits = tiff_chain::Limits::default();
    limits.ifd_value_size = 1_000_000;
    limits.max_directories = 10_000;
    chain = chain.with_limits(limits);

    let count = match chain.number_of_directories() {
        Ok(count) => count,
        Err(_) => return,
    };

    for n in 0..count {
        if chain.set_directory(n).is_err() {
            continue;
        }
        if let Ok(subs) = chain.current().sub_ifds() {
            for sub in subs {
                let _ = chain.set_sub_directory(sub);
                while let Ok(true) = chain.read_next() {}
            }
        }
    }

    // Appending must keep whatever chain was readable intact.
    let dir = chain.create_directory();
    if dir.set(tiff_chain::tags::Tag::ImageWidth, &1u32).is_ok() && chain.write_directory().is_ok()
    {
        assert_eq!(chain.number_of_directories().ok(), Some(count + 1));
    }
});
