#![allow(dead_code)]

use std::alloc::Layout;
use strata_oops::{desc::ArrayOopDesc, Klass, KlassKind, OopDesc, VmFlags};

const OBJECT_ALIGNMENT: usize = 8;

/// A fake heap that hands out zeroed, properly headed objects and frees them when dropped.
#[derive(Default)]
pub struct TestHeap {
    klasses: Vec<Box<Klass>>,
    objects: Vec<(*mut u8, Layout)>,
}

impl TestHeap {
    /// Allocates an object described by a fresh descriptor of class `kind` that spans `size`
    /// bytes.
    pub fn alloc(&mut self, kind: KlassKind, size: usize) -> *mut OopDesc {
        let size = size.max(std::mem::size_of::<OopDesc>());
        let klass = Box::new(Klass::new(format!("{kind:?}"), kind, size));
        let layout = Layout::from_size_align(size, OBJECT_ALIGNMENT).expect("invalid layout");

        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        assert!(!ptr.is_null(), "allocation failed");
        unsafe { ptr.cast::<OopDesc>().write(OopDesc::new(&klass)) };

        self.klasses.push(klass);
        self.objects.push((ptr, layout));
        ptr.cast()
    }

    /// Allocates an array with `length` elements of `element_size` bytes.
    pub fn alloc_array(&mut self, kind: KlassKind, length: u32, element_size: usize) -> *mut OopDesc {
        let size = std::mem::size_of::<ArrayOopDesc>() + length as usize * element_size;
        let obj = self.alloc(kind, size);
        unsafe {
            let header = obj.read();
            obj.cast::<ArrayOopDesc>()
                .write(ArrayOopDesc::new(header, length));
        }
        obj
    }
}

impl Drop for TestHeap {
    fn drop(&mut self) {
        for (ptr, layout) in self.objects.drain(..) {
            unsafe { std::alloc::dealloc(ptr, layout) };
        }
    }
}

/// Turns on unhandled oop checking for the whole test binary.
pub fn enable_checking() {
    VmFlags::builder().check_unhandled_oops(true).build().install();
}
