//! Reference counting and sweep behavior through the public VM surface.

use arx_asm::{Instruction, Operation};
use arx_mod::{ClassManifest, ModuleFlags, ModuleHeader, StringTable};
use arx_vm::registry::ClassRegistry;
use arx_vm::{Interpreter, ModuleImage, ObjectManager, VmParams};

use proptest::prelude::*;

fn vm_with_strings(
    instructions: Vec<Instruction>,
    pool: &[&str],
) -> Interpreter<&'static [u8], Vec<u8>> {
    let mut strings = StringTable::new();
    for s in pool {
        strings.intern(s);
    }
    let image = ModuleImage {
        header: ModuleHeader {
            flags: ModuleFlags::EXECUTABLE,
            toc_offset: 80,
            toc_size: 192,
            data_offset: 272,
            data_size: 0,
            app_name_len: 0,
            app_data_size: 0,
            entry_point: 0,
        },
        instructions,
        strings,
        registry: ClassRegistry::from_manifest(&ClassManifest::default()),
        app: None,
    };
    Interpreter::new(image, VmParams::default(), &b""[..], Vec::new()).unwrap()
}

#[test]
fn released_string_objects_are_swept_and_zeroed() {
    let mut vm = vm_with_strings(
        vec![
            Instruction::lit(0),
            Instruction::lit(1),
            Instruction::opr(Operation::StrConcat),
            Instruction::halt(),
        ],
        &["left", "right"],
    );
    vm.run().unwrap();

    let address = vm.stack()[0];
    assert!(vm.memory()[address as usize] != 0);

    assert!(vm.release_object(address));
    let stats = vm.garbage_collect();
    assert_eq!(stats.freed_objects, 1);

    let entry = &vm.objects().entries()[0];
    assert!(!entry.is_alive);
    let start = entry.address as usize;
    let end = start + entry.size as usize;
    assert!(vm.memory()[start..end].iter().all(|&w| w == 0));
}

#[test]
fn retained_objects_survive_the_sweep() {
    let mut vm = vm_with_strings(
        vec![
            Instruction::lit(0),
            Instruction::lit(1),
            Instruction::opr(Operation::StrConcat),
            Instruction::halt(),
        ],
        &["a", "b"],
    );
    vm.run().unwrap();

    let address = vm.stack()[0];
    assert!(vm.reference_object(address));
    assert!(vm.release_object(address));

    let stats = vm.garbage_collect();
    assert_eq!(stats.survivors, 1);
    assert_eq!(stats.freed_objects, 0);
    assert!(vm.objects().entries()[0].is_alive);
}

proptest! {
    /// Sweep soundness over arbitrary retain/release interleavings: after
    /// a sweep, positive refcounts are alive and zero refcounts are dead
    /// with zeroed memory. Entries are never removed from the table.
    #[test]
    fn sweep_soundness(ops in proptest::collection::vec((0usize..8, proptest::bool::ANY), 0..64)) {
        let region_end = 10_000 + 8 * 16;
        let mut memory = vec![0u64; region_end];
        let mut manager = ObjectManager::new(10_000, region_end);

        let handles: Vec<_> = (0..8)
            .map(|i| manager.allocate(1, 4, i).unwrap())
            .collect();
        for handle in &handles {
            let start = handle.address as usize;
            memory[start..start + 4].fill(0xFEED);
        }

        for (index, retain) in ops {
            let address = handles[index].address;
            if retain {
                manager.retain(address);
            } else {
                manager.release(address);
            }
        }

        manager.collect(&mut memory);

        prop_assert_eq!(manager.entries().len(), handles.len());
        for entry in manager.entries() {
            if entry.refcount > 0 {
                prop_assert!(entry.is_alive);
            } else {
                prop_assert!(!entry.is_alive);
                let start = entry.address as usize;
                let end = start + entry.size as usize;
                prop_assert!(memory[start..end].iter().all(|&w| w == 0));
            }
        }
    }
}
