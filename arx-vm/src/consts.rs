//! VM parameters and memory-region layout.

use arx_asm::Word;

/// Memory size of a [`Word`].
pub const WORD_SIZE: usize = core::mem::size_of::<Word>();

/// Default size of linear VM memory, in slots.
pub const MEMORY_SLOTS: usize = 65_536;

/// Default capacity of the data stack, in slots.
pub const STACK_SLOTS: usize = 1_024;

/// Base address of the level-0 variable region.
pub const VAR_REGION_BASE: usize = 1_000;

/// Base address of the object region. Everything below is variables and
/// scratch; everything at or above is objects. The `OUTSTRING` and
/// `STR_CONCAT` paths depend on this zone boundary.
pub const OBJECT_REGION_BASE: usize = 10_000;

/// Maximum call-frame depth before `CALL_STACK_OVERFLOW`.
pub const CALL_STACK_DEPTH: usize = 50;

/// Local slots available to each call frame. Level-0 addressing advances
/// by one window per frame so a callee's locals never clobber its
/// caller's; the entry method's window starts at [`VAR_REGION_BASE`].
pub const LOCALS_PER_FRAME: usize = 64;

/// Default instruction-count guard for runaway programs.
pub const DEFAULT_STEP_LIMIT: u64 = 5_000;

/// Consecutive steps the program counter may stay put before the VM gives
/// up on the program.
pub const PC_STUCK_LIMIT: u32 = 100;

/// Maximum number of entries accepted into the literal pool.
pub const STRING_TABLE_CAPACITY: usize = 4_096;

/// Tag slot value marking a string object in the object region.
pub const OBJ_TYPE_STRING: Word = 0x53;

/// Base address of the locals region for a lexical level.
pub const fn level_base(level: u8) -> usize {
    if level == 0 {
        VAR_REGION_BASE
    } else {
        2_000 + 1_000 * level as usize
    }
}

static_assertions::const_assert!(VAR_REGION_BASE < OBJECT_REGION_BASE);
static_assertions::const_assert!(OBJECT_REGION_BASE < MEMORY_SLOTS);
static_assertions::const_assert!(
    VAR_REGION_BASE + (CALL_STACK_DEPTH + 1) * LOCALS_PER_FRAME <= OBJECT_REGION_BASE
);
