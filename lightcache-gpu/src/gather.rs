use crate::{
    try_allocate, AtomicSlots, CacheHeader, CascadeCell, GBufferEntry, Globals,
};

/// Makes sure that the cell(s) responsible for given pixel have caches
/// allocated.
///
/// Pixels lying in a transition zone between two cascades request caches in
/// both of them, so that the apply pass can blend across the boundary.
pub fn gather(
    gbuffer: GBufferEntry,
    globals: &Globals,
    addresses: &mut impl AtomicSlots,
    counter: &mut impl AtomicSlots,
    headers: &mut impl AtomicSlots,
) {
    if !gbuffer.is_some() {
        return;
    }

    let selection = globals.volume.select(gbuffer.position);

    request(
        selection.primary,
        gbuffer,
        globals,
        addresses,
        counter,
        headers,
    );

    if selection.is_blended() {
        request(
            selection.secondary,
            gbuffer,
            globals,
            addresses,
            counter,
            headers,
        );
    }
}

fn request(
    cell: CascadeCell,
    gbuffer: GBufferEntry,
    globals: &Globals,
    addresses: &mut impl AtomicSlots,
    counter: &mut impl AtomicSlots,
    headers: &mut impl AtomicSlots,
) {
    let header = CacheHeader {
        address: globals.volume.address(cell),
        normal: gbuffer.normal,
    };

    try_allocate(addresses, counter, headers, header, globals.capacity());
}
