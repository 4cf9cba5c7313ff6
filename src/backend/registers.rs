use crate::backend::error::CodegenError;

/// General purpose registers handed out for intermediate values, with their
/// low byte names. `rax`, `rdx`, `rdi` and `rsi` stay outside the pool since
/// division and the print call use them implicitly.
const SCRATCH: [(&str, &str); 7] = [
    ("r8", "r8b"),
    ("r9", "r9b"),
    ("r10", "r10b"),
    ("r12", "r12b"),
    ("r13", "r13b"),
    ("r14", "r14b"),
    ("r15", "r15b"),
];

/// Handle to one pool register. Only the pool creates these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register(usize);

#[derive(Debug)]
struct Slot {
    name: &'static str,
    byte_name: &'static str,
    busy: bool,
}

#[derive(Debug)]
pub struct RegisterPool {
    slots: Vec<Slot>,
}

impl Default for RegisterPool {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterPool {
    pub fn new() -> Self {
        Self {
            slots: SCRATCH
                .iter()
                .map(|&(name, byte_name)| Slot {
                    name,
                    byte_name,
                    busy: false,
                })
                .collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn busy_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.busy).count()
    }

    /// Marks the first free register busy and returns it.
    pub fn allocate(&mut self) -> Result<Register, CodegenError> {
        let index = self
            .slots
            .iter()
            .position(|slot| !slot.busy)
            .ok_or(CodegenError::RegistersExhausted {
                capacity: self.slots.len(),
            })?;
        self.slots[index].busy = true;
        Ok(Register(index))
    }

    pub fn release(&mut self, register: Register) -> Result<(), CodegenError> {
        let slot = self.slot_mut(register)?;
        if !slot.busy {
            return Err(CodegenError::RegisterFault {
                register: slot.name,
                reason: "released while already free",
            });
        }
        slot.busy = false;
        Ok(())
    }

    /// Fails unless `register` currently holds a live value.
    pub fn ensure_busy(&self, register: Register) -> Result<(), CodegenError> {
        let slot = self.slot(register)?;
        if slot.busy {
            Ok(())
        } else {
            Err(CodegenError::RegisterFault {
                register: slot.name,
                reason: "used while free",
            })
        }
    }

    pub fn name(&self, register: Register) -> Result<&'static str, CodegenError> {
        self.slot(register).map(|slot| slot.name)
    }

    pub fn byte_name(&self, register: Register) -> Result<&'static str, CodegenError> {
        self.slot(register).map(|slot| slot.byte_name)
    }

    fn slot(&self, register: Register) -> Result<&Slot, CodegenError> {
        self.slots.get(register.0).ok_or(CodegenError::RegisterFault {
            register: "?",
            reason: "not part of the pool",
        })
    }

    fn slot_mut(&mut self, register: Register) -> Result<&mut Slot, CodegenError> {
        self.slots.get_mut(register.0).ok_or(CodegenError::RegisterFault {
            register: "?",
            reason: "not part of the pool",
        })
    }
}
